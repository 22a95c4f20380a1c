//! 持久化模块：设备级键值存储。
//!
//! # Storage Module
//!
//! Durable client-side key/value storage, the analogue of a browser's local
//! storage. Only the identity token lives here today.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`FileStorage`] | JSON object file, written atomically |
//! | [`MemoryStorage`] | Process-local map for tests and ephemeral front ends |

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage lock poisoned")]
    Poisoned,
}
