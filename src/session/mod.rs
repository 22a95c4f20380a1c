//! 会话模块：消息历史与加载阶段状态机。
//!
//! # Session Module
//!
//! A [`SessionController`] owns one conversation for the lifetime of a chat
//! widget. It moves through [`Phase::Initializing`] once, then cycles between
//! [`Phase::Ready`] and [`Phase::AwaitingReply`]:
//!
//! ```text
//! Initializing --(greeting seeded)--> Ready --(send)--> AwaitingReply
//!                                       ^                     |
//!                                       +--(reply | failure)--+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use recruit_chat::{SendOutcome, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> recruit_chat::Result<()> {
//!     let session = SessionBuilder::new().build().await?;
//!     session.initialize().await;
//!
//!     if let SendOutcome::Replied { appended, .. } = session.send("1").await {
//!         println!("{appended} new entries");
//!     }
//!     Ok(())
//! }
//! ```

mod builder;
mod controller;
mod state;

pub use builder::SessionBuilder;
pub use controller::{SessionController, FALLBACK_REPLY, GREETING};
pub use state::{Phase, SendOutcome, SessionState};
