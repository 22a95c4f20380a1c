//! # recruit-chat
//!
//! 采用聊天窗口的会话运行时：历史、设备标识、后端交互与回复分类。
//!
//! Session runtime for a recruiting chat widget. It owns the conversation
//! history, a per-device identity token, the request/response exchange with
//! the chat backend, and the translation of raw replies into display entries.
//!
//! ## Overview
//!
//! - **Session**: [`SessionController`] is the state machine behind one widget
//!   instance. Sends are optimistic (the visitor's entry shows up before the
//!   backend answers) and serialized (one exchange in flight per session).
//! - **Classification**: backend replies are split into schedule options, FAQ
//!   passages or plain text by [`classify()`].
//! - **Identity**: a UUID generated once per device and persisted through a
//!   [`storage::KeyValueStorage`].
//! - **Composition**: [`InputComposer`] keeps IME confirmation keystrokes from
//!   submitting half-typed text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recruit_chat::{InputComposer, Key, KeyOutcome, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> recruit_chat::Result<()> {
//!     let session = SessionBuilder::new().build().await?;
//!     session.initialize().await;
//!
//!     let mut composer = InputComposer::new();
//!     composer.set_draft("1");
//!     if let KeyOutcome::Submit(text) = composer.on_key_down(Key::Enter) {
//!         session.send(&text).await;
//!     }
//!
//!     for message in session.state().display_messages() {
//!         println!("{}: {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Session state machine, builder and snapshots |
//! | [`classify`](mod@classify) | Marker-based reply classification |
//! | [`transport`] | Backend exchange (`ChatTransport`, `HttpTransport`) |
//! | [`identity`] | Per-device identity token |
//! | [`storage`] | Durable key/value storage backends |
//! | [`composer`] | Draft and IME composition tracking |
//! | [`diagnostics`] | Debug-log and failure reporting channel |
//! | [`config`] | Environment-driven configuration |
//! | [`types`] | Messages and wire types |

pub mod classify;
pub mod composer;
pub mod config;
pub mod diagnostics;
pub mod identity;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use classify::{classify, ReplyKind};
pub use composer::{InputComposer, Key, KeyOutcome};
pub use config::ChatConfig;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink};
pub use identity::IdentityStore;
pub use session::{Phase, SendOutcome, SessionBuilder, SessionController, SessionState};
pub use transport::{ChatTransport, HttpTransport, TransportError};
pub use types::{Message, MessageRole, ReplyPayload};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
