use super::{ChatTransport, TransportError};
use crate::config::ChatConfig;
use crate::types::{ChatRequest, ReplyPayload};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const CHAT_PATH: &str = "/chat";

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Self::new(config.backend_url.as_str(), config.request_timeout)
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CHAT_PATH)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat_message(&self, request: &ChatRequest) -> std::result::Result<ReplyPayload, TransportError> {
        let url = self.endpoint();
        debug!(%url, context_len = request.context.len(), "posting chat message");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            // Body is best-effort; it only feeds diagnostics.
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ReplyPayload>()
            .await
            .map_err(|e| self.classify_error(e))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

impl HttpTransport {
    fn classify_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Http(e)
        }
    }
}
