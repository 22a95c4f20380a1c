//! Turns a raw backend reply into display entries.
//!
//! Dispatch is by marker substring, first match wins:
//!
//! 1. [`SCHEDULE_MARKER`]: the first line is dropped and every remaining
//!    non-empty line becomes its own option entry, preceded by
//!    [`SCHEDULE_LEAD_IN`]. Later lines that repeat the marker are headings,
//!    not options, and are dropped too.
//! 2. [`FAQ_MARKER`]: the reply is passed through as a single entry.
//! 3. Anything else: passed through as a single entry.
//!
//! A plain reply that mentions "FAQ" anywhere is classified as an FAQ passage.

use crate::types::Message;

pub const SCHEDULE_MARKER: &str = "候補日程";
pub const FAQ_MARKER: &str = "FAQ";
pub const SCHEDULE_LEAD_IN: &str = "次の候補日程はいかがでしょうか？";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Schedule,
    Faq,
    Text,
}

impl ReplyKind {
    pub fn detect(raw: &str) -> Self {
        if raw.contains(SCHEDULE_MARKER) {
            ReplyKind::Schedule
        } else if raw.contains(FAQ_MARKER) {
            ReplyKind::Faq
        } else {
            ReplyKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Schedule => "schedule",
            ReplyKind::Faq => "faq",
            ReplyKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ReplyKind,
    pub messages: Vec<Message>,
}

pub fn classify(raw: &str) -> Vec<Message> {
    classify_with_kind(raw).messages
}

pub fn classify_with_kind(raw: &str) -> Classified {
    let kind = ReplyKind::detect(raw);
    let messages = match kind {
        ReplyKind::Schedule => schedule_entries(raw),
        ReplyKind::Faq | ReplyKind::Text => vec![Message::bot(raw)],
    };
    Classified { kind, messages }
}

fn schedule_entries(raw: &str) -> Vec<Message> {
    let options = raw
        .split('\n')
        .skip(1)
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.contains(SCHEDULE_MARKER))
        .map(Message::bot);

    std::iter::once(Message::bot(SCHEDULE_LEAD_IN))
        .chain(options)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn schedule_drops_first_line_and_splits_options() {
        let out = classify("ご案内\n候補日程\n2024-01-10 10:00\n2024-01-11 14:00");
        assert_eq!(
            contents(&out),
            vec![SCHEDULE_LEAD_IN, "2024-01-10 10:00", "2024-01-11 14:00"]
        );
        assert!(out.iter().all(Message::is_bot));
    }

    #[test]
    fn schedule_with_marker_on_first_line() {
        let out = classify("次の候補日程はいかがでしょうか？\n2024-01-10 10:00\n2024-01-11 14:00");
        assert_eq!(
            contents(&out),
            vec![SCHEDULE_LEAD_IN, "2024-01-10 10:00", "2024-01-11 14:00"]
        );
    }

    #[test]
    fn schedule_single_line_yields_only_lead_in() {
        let out = classify("候補日程を確認しています");
        assert_eq!(contents(&out), vec![SCHEDULE_LEAD_IN]);
    }

    #[test]
    fn schedule_skips_empty_lines() {
        let out = classify("候補日程\nA\n\n  \nB\n");
        assert_eq!(contents(&out), vec![SCHEDULE_LEAD_IN, "A", "B"]);
    }

    #[test]
    fn schedule_strips_carriage_returns() {
        let out = classify("候補日程\r\nA\r\nB");
        assert_eq!(contents(&out), vec![SCHEDULE_LEAD_IN, "A", "B"]);
    }

    #[test]
    fn schedule_options_keep_surrounding_spaces() {
        let out = classify("候補日程\n 1. 12/25 10:00 ");
        assert_eq!(contents(&out), vec![SCHEDULE_LEAD_IN, " 1. 12/25 10:00 "]);
    }

    #[test]
    fn schedule_marker_wins_over_faq() {
        let c = classify_with_kind("FAQ\n候補日程\nA");
        assert_eq!(c.kind, ReplyKind::Schedule);
    }

    #[test]
    fn faq_passes_through_unchanged() {
        let raw = "FAQ: 入社日はいつですか？";
        let c = classify_with_kind(raw);
        assert_eq!(c.kind, ReplyKind::Faq);
        assert_eq!(contents(&c.messages), vec![raw]);
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let raw = "承知しました。";
        let c = classify_with_kind(raw);
        assert_eq!(c.kind, ReplyKind::Text);
        assert_eq!(c.messages, vec![Message::bot(raw)]);
    }

    #[test]
    fn multiline_plain_text_is_not_split() {
        let raw = "一行目\n二行目";
        assert_eq!(classify(raw), vec![Message::bot(raw)]);
    }
}
