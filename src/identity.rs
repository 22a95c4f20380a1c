//! Stable per-device identity token.
//!
//! The token is generated once (UUID v4), persisted under [`USER_ID_KEY`], and
//! reused by every later session that shares the same storage.

use crate::storage::KeyValueStorage;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub const USER_ID_KEY: &str = "user_id";

pub struct IdentityStore {
    storage: Arc<dyn KeyValueStorage>,
    cached: OnceCell<String>,
}

impl IdentityStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            cached: OnceCell::new(),
        }
    }

    /// Return the device identity, creating and persisting it on first use.
    pub async fn get_identity(&self) -> Result<String> {
        self.cached
            .get_or_try_init(|| self.load_or_create())
            .await
            .cloned()
    }

    async fn load_or_create(&self) -> Result<String> {
        if let Some(existing) = self.storage.get(USER_ID_KEY).await? {
            let existing = existing.trim().to_string();
            if !existing.is_empty() {
                debug!(backend = self.storage.name(), "reusing stored identity");
                return Ok(existing);
            }
        }

        let created = uuid::Uuid::new_v4().to_string();
        self.storage.set(USER_ID_KEY, &created).await.map_err(|e| {
            Error::identity_with_context(
                "failed to persist new identity",
                ErrorContext::new()
                    .with_field_path(USER_ID_KEY)
                    .with_details(e.to_string())
                    .with_source("identity_store"),
            )
        })?;
        info!(backend = self.storage.name(), "created new device identity");
        Ok(created)
    }
}
