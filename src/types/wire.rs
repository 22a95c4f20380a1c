//! Request/response bodies for the backend `/chat` endpoint.

use super::message::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Role/content pair carried as conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for ContextEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Body of `POST {base_url}/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: Vec<ContextEntry>,
    pub user_id: String,
}

impl ChatRequest {
    /// Build a request from the history that precedes `message`.
    ///
    /// Loading placeholders are skipped; only role and content travel.
    pub fn new(message: impl Into<String>, history: &[Message], user_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: history
                .iter()
                .filter(|m| !m.is_loading)
                .map(ContextEntry::from)
                .collect(),
            user_id: user_id.into(),
        }
    }
}

/// Backend reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<Vec<String>>,
}

impl ReplyPayload {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            debug_log: None,
        }
    }

    pub fn with_debug_log(mut self, lines: Vec<String>) -> Self {
        self.debug_log = Some(lines);
        self
    }
}
