//! Client configuration loaded from environment variables.
//!
//! All settings have defaults pointing at a locally running backend so the
//! client starts with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use penguin_shared::constants::{
    DEFAULT_CHAT_SERVICE_URL, DEFAULT_MAX_BACKOFF_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_SERVICE_URL,
};

use crate::sync::SyncConfig;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the user service (`/register`, `/login`).
    /// Env: `PENGUIN_USER_SERVICE_URL`
    pub user_service_url: String,

    /// Base URL of the chat service, including its `/api` prefix.
    /// Env: `PENGUIN_CHAT_SERVICE_URL`
    pub chat_service_url: String,

    /// Websocket endpoint for pushed messages. Polling only when unset.
    /// Env: `PENGUIN_PUSH_URL` (e.g. `ws://localhost:8081/ws`)
    pub push_url: Option<Url>,

    /// Message refresh period while a chat is open.
    /// Env: `PENGUIN_POLL_INTERVAL_MS`
    pub poll_interval: Duration,

    /// Cap on the retry delay after consecutive failures.
    /// Env: `PENGUIN_MAX_BACKOFF_MS`
    pub max_backoff: Duration,

    /// Per-request HTTP timeout.
    /// Env: `PENGUIN_REQUEST_TIMEOUT_MS`
    pub request_timeout: Duration,

    /// Directory holding `penguin.db`. Platform data dir when unset.
    /// Env: `PENGUIN_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_service_url: DEFAULT_USER_SERVICE_URL.to_string(),
            chat_service_url: DEFAULT_CHAT_SERVICE_URL.to_string(),
            push_url: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PENGUIN_USER_SERVICE_URL") {
            config.user_service_url = url;
        }

        if let Some(url) = lookup("PENGUIN_CHAT_SERVICE_URL") {
            config.chat_service_url = url;
        }

        if let Some(raw) = lookup("PENGUIN_PUSH_URL").filter(|v| !v.trim().is_empty()) {
            match Url::parse(raw.trim()) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") => config.push_url = Some(url),
                Ok(url) => {
                    tracing::warn!(value = %url, "PENGUIN_PUSH_URL must be ws:// or wss://, push disabled");
                }
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid PENGUIN_PUSH_URL, push disabled");
                }
            }
        }

        if let Some(d) = millis(&lookup, "PENGUIN_POLL_INTERVAL_MS") {
            config.poll_interval = d;
        }

        if let Some(d) = millis(&lookup, "PENGUIN_MAX_BACKOFF_MS") {
            config.max_backoff = d;
        }

        if let Some(d) = millis(&lookup, "PENGUIN_REQUEST_TIMEOUT_MS") {
            config.request_timeout = d;
        }

        if let Some(dir) = lookup("PENGUIN_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            interval: self.poll_interval,
            max_backoff: self.max_backoff.max(self.poll_interval),
            push_url: self.push_url.clone(),
        }
    }
}

/// Parse a positive millisecond count, warning on garbage.
fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid duration, using default");
            None
        }
    }
}
