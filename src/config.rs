//! Environment-driven runtime configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RECRUIT_CHAT_BACKEND_URL` | `http://127.0.0.1:8000` |
//! | `RECRUIT_CHAT_TIMEOUT_SECS` | `30` |
//! | `RECRUIT_CHAT_GREETING_DELAY_MS` | `2000` |
//! | `RECRUIT_CHAT_STATE_PATH` | `<config dir>/recruit-chat/state.json` |

use crate::{Error, ErrorContext, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const BACKEND_URL_ENV: &str = "RECRUIT_CHAT_BACKEND_URL";
pub const TIMEOUT_SECS_ENV: &str = "RECRUIT_CHAT_TIMEOUT_SECS";
pub const GREETING_DELAY_MS_ENV: &str = "RECRUIT_CHAT_GREETING_DELAY_MS";
pub const STATE_PATH_ENV: &str = "RECRUIT_CHAT_STATE_PATH";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GREETING_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub backend_url: Url,
    /// Per-request timeout for the backend exchange.
    pub request_timeout: Duration,
    /// Presentational pause before the greeting appears.
    pub greeting_delay: Duration,
    /// Where the identity token is persisted. `None` keeps it in memory.
    pub state_path: Option<PathBuf>,
}

impl ChatConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary lookup (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(BACKEND_URL_ENV)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = parse_backend_url(&raw_url)?;

        let request_timeout = Duration::from_secs(
            parse_number(&lookup, TIMEOUT_SECS_ENV)?
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
                .max(1),
        );
        let greeting_delay = Duration::from_millis(
            parse_number(&lookup, GREETING_DELAY_MS_ENV)?.unwrap_or(DEFAULT_GREETING_DELAY_MS),
        );

        let state_path = lookup(STATE_PATH_ENV)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_state_path);

        Ok(Self {
            backend_url,
            request_timeout,
            greeting_delay,
            state_path,
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend url is valid"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            greeting_delay: Duration::from_millis(DEFAULT_GREETING_DELAY_MS),
            state_path: None,
        }
    }
}

pub(crate) fn parse_backend_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        Error::configuration_with_context(
            "invalid backend url",
            ErrorContext::new()
                .with_field_path(BACKEND_URL_ENV)
                .with_details(format!("{raw}: {e}"))
                .with_source("config"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            "backend url must use http or https",
            ErrorContext::new()
                .with_field_path(BACKEND_URL_ENV)
                .with_details(raw.to_string())
                .with_source("config"),
        ));
    }
    Ok(url)
}

fn parse_number<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse::<u64>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                "expected a non-negative integer",
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(format!("{s}: {e}"))
                    .with_source("config"),
            )
        }),
    }
}

fn default_state_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("recruit-chat").join("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ChatConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.greeting_delay, Duration::from_millis(2000));
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = ChatConfig::from_lookup(lookup(&[
            (BACKEND_URL_ENV, "https://chat.example.com/api"),
            (TIMEOUT_SECS_ENV, "5"),
            (GREETING_DELAY_MS_ENV, "0"),
            (STATE_PATH_ENV, "/tmp/recruit-chat-state.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url.as_str(), "https://chat.example.com/api");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.greeting_delay, Duration::ZERO);
        assert_eq!(
            cfg.state_path,
            Some(PathBuf::from("/tmp/recruit-chat-state.json"))
        );
    }

    #[test]
    fn blank_backend_url_falls_back_to_default() {
        let cfg = ChatConfig::from_lookup(lookup(&[(BACKEND_URL_ENV, "  ")])).unwrap();
        assert_eq!(cfg.backend_url.host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn invalid_backend_url_is_rejected() {
        let err = ChatConfig::from_lookup(lookup(&[(BACKEND_URL_ENV, "not a url")])).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        let err = ChatConfig::from_lookup(lookup(&[(BACKEND_URL_ENV, "ftp://host")])).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = ChatConfig::from_lookup(lookup(&[(TIMEOUT_SECS_ENV, "soon")])).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some(TIMEOUT_SECS_ENV)
        );
    }
}
