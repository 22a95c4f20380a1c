use super::controller::SessionController;
use crate::config::{parse_backend_url, ChatConfig};
use crate::diagnostics::{noop_sink, DiagnosticSink};
use crate::identity::IdentityStore;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::transport::{ChatTransport, HttpTransport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Builder for a [`SessionController`].
///
/// Anything not set explicitly comes from [`ChatConfig`] (environment by
/// default): an HTTP transport against the configured backend, file storage
/// at the configured state path.
pub struct SessionBuilder {
    config: Option<ChatConfig>,
    transport: Option<Arc<dyn ChatTransport>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    identity: Option<IdentityStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    greeting_delay: Option<Duration>,
    reply_timeout: Option<Option<Duration>>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
            storage: None,
            identity: None,
            diagnostics: noop_sink(),
            greeting_delay: None,
            reply_timeout: None,
            base_url_override: None,
        }
    }

    /// Use this configuration instead of reading the environment.
    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom transport. The backend URL is then ignored.
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Durable storage backing the identity token.
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Inject a ready identity store. Takes precedence over [`storage`](Self::storage).
    pub fn identity_store(mut self, store: IdentityStore) -> Self {
        self.identity = Some(store);
        self
    }

    /// Inject a diagnostic sink. Default is a no-op sink.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn greeting_delay(mut self, delay: Duration) -> Self {
        self.greeting_delay = Some(delay);
        self
    }

    /// Upper bound on one exchange. `None` disables the session-level guard
    /// and leaves only the transport's own timeout.
    pub fn reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Override the configured backend base URL.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Resolve the identity and build the controller in `Initializing` phase.
    ///
    /// Call [`SessionController::initialize`] to seed the greeting.
    pub async fn build(self) -> Result<SessionController> {
        let mut config = match self.config {
            Some(config) => config,
            None => ChatConfig::from_env()?,
        };
        if let Some(raw) = self.base_url_override.as_deref() {
            config.backend_url = parse_backend_url(raw)?;
        }

        let transport: Arc<dyn ChatTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_config(&config)?),
        };

        let identity = match self.identity {
            Some(store) => store,
            None => {
                let storage = self.storage.unwrap_or_else(|| default_storage(&config));
                IdentityStore::new(storage)
            }
        };
        let user_id = identity.get_identity().await?;

        Ok(SessionController::new(
            user_id,
            transport,
            self.diagnostics,
            self.greeting_delay.unwrap_or(config.greeting_delay),
            self.reply_timeout.unwrap_or(Some(config.request_timeout)),
        ))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_storage(config: &ChatConfig) -> Arc<dyn KeyValueStorage> {
    match &config.state_path {
        Some(path) => Arc::new(FileStorage::new(path)),
        None => {
            warn!("no state path available, identity will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    }
}
