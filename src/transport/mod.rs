//! 传输层：与聊天后端进行一次请求/响应交换。
//!
//! # Transport Module
//!
//! [`ChatTransport`] is the seam the session talks through. [`HttpTransport`]
//! is the production implementation posting JSON to `{base_url}/chat`; tests
//! and alternative front ends can plug in their own.

pub mod http;

pub use http::HttpTransport;

use crate::types::{ChatRequest, ReplyPayload};
use async_trait::async_trait;
use std::time::Duration;

/// One request/response exchange with the chat backend.
///
/// Implementations perform exactly one attempt. No retries.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_chat_message(&self, request: &ChatRequest) -> Result<ReplyPayload, TransportError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the backend was reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_connect())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
