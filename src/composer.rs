//! Input composition state: the pending draft and IME composition tracking.
//!
//! An Enter press during a multi-keystroke IME composition confirms the
//! candidate text, it must not submit the message. The composer swallows it.

/// Key presses the composer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

/// What the front end should do with a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Hand this text to the session. The draft has been cleared.
    Submit(String),
    /// Enter pressed mid-composition; ignore it.
    Suppressed,
    /// Enter pressed with a blank draft; nothing to send.
    Empty,
    /// Not a submit key; let the default action run.
    PassThrough,
}

impl KeyOutcome {
    /// Whether the platform default for the key (newline, form submit) must be prevented.
    pub fn prevents_default(&self) -> bool {
        !matches!(self, KeyOutcome::PassThrough)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputComposer {
    draft: String,
    composing: bool,
}

impl InputComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    pub fn composition_end(&mut self) {
        self.composing = false;
    }

    pub fn on_key_down(&mut self, key: Key) -> KeyOutcome {
        match key {
            Key::Other => KeyOutcome::PassThrough,
            Key::Enter if self.composing => KeyOutcome::Suppressed,
            Key::Enter => self
                .take_submission()
                .map(KeyOutcome::Submit)
                .unwrap_or(KeyOutcome::Empty),
        }
    }

    /// Send button. Submits regardless of composition state.
    pub fn click_send(&mut self) -> Option<String> {
        self.take_submission()
    }

    /// Take the draft if it has visible content; a blank draft is left as is.
    fn take_submission(&mut self) -> Option<String> {
        if self.draft.trim().is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.draft))
        }
    }
}
