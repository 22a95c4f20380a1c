//! 类型系统模块：会话消息与后端线协议的数据类型。
//!
//! # Types Module
//!
//! Core data types shared by the session, the classifier and the transport.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | History entry with role, content and transient loading marker |
//! | [`MessageRole`] | Who authored a message (user or bot) |
//! | [`ChatRequest`] | Body posted to the backend `/chat` endpoint |
//! | [`ContextEntry`] | Role/content pair carried as conversation context |
//! | [`ReplyPayload`] | Backend reply with optional debug log |
//!
//! ## Example
//!
//! ```rust
//! use recruit_chat::types::{ChatRequest, Message};
//!
//! let history = vec![Message::bot("こんにちは！"), Message::user("1")];
//! let request = ChatRequest::new("2", &history, "device-id");
//! assert_eq!(request.context.len(), 2);
//! ```

pub mod message;
pub mod wire;

pub use message::{Message, MessageRole};
pub use wire::{ChatRequest, ContextEntry, ReplyPayload};
