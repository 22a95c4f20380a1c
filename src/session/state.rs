//! Session snapshot and loading phases.

use crate::classify::ReplyKind;
use crate::types::Message;

/// Loading phase of a session.
///
/// `Initializing -> Ready` once, then `Ready <-> AwaitingReply` for the rest
/// of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Initializing,
    Ready,
    AwaitingReply,
}

impl Phase {
    pub fn can_send(&self) -> bool {
        matches!(self, Phase::Ready)
    }

    pub fn is_loading(&self) -> bool {
        !self.can_send()
    }
}

/// Snapshot of one session, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub history: Vec<Message>,
    pub phase: Phase,
    pub identity: String,
}

impl SessionState {
    pub(crate) fn new(identity: String) -> Self {
        Self {
            history: Vec::new(),
            phase: Phase::Initializing,
            identity,
        }
    }

    /// Rows for the renderer.
    ///
    /// While initializing only a single loading placeholder is shown. While a
    /// reply is pending the history is followed by one placeholder. The
    /// placeholder never enters `history`.
    pub fn display_messages(&self) -> Vec<Message> {
        match self.phase {
            Phase::Initializing => vec![Message::loading()],
            Phase::Ready => self.history.clone(),
            Phase::AwaitingReply => {
                let mut rows = Vec::with_capacity(self.history.len() + 1);
                rows.extend(self.history.iter().cloned());
                rows.push(Message::loading());
                rows
            }
        }
    }
}

/// Result of [`SessionController::send`](super::SessionController::send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input. Nothing happened.
    Ignored,
    /// The session was not ready (still initializing, or a reply is pending).
    Busy(Phase),
    /// The reply arrived and `appended` entries were added.
    Replied { kind: ReplyKind, appended: usize },
    /// The exchange failed and the fallback message was added.
    Failed,
}
