//! Conversation message format shared by history and the renderer.

use serde::{Deserialize, Serialize};

/// A single conversation entry.
///
/// `is_loading` marks a transient placeholder produced for display only.
/// History never stores one and it is never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_loading: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
            is_loading: false,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Bot,
            content: text.into(),
            is_loading: false,
        }
    }

    /// Bot-side "typing" placeholder shown while a reply is pending.
    pub fn loading() -> Self {
        Self {
            role: MessageRole::Bot,
            content: String::new(),
            is_loading: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_bot(&self) -> bool {
        self.role == MessageRole::Bot
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Bot => "bot",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
