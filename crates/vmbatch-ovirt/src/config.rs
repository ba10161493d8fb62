//! Connection settings for the oVirt engine

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vmbatch_core::RemoteError;

/// Default HTTP timeout per request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How to reach and authenticate against the engine
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// API endpoint, e.g. `https://engine.example.com/ovirt-engine/api`
    pub url: String,
    /// User in `name@profile` form
    pub username: String,
    /// Password
    pub password: String,
    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ConnectionConfig {
    /// Create a config with the default timeout and TLS verification on
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            insecure: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API base without a trailing slash
    pub fn api_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Engine base, the API URL with its trailing `/api` removed
    pub fn engine_url(&self) -> &str {
        let api = self.api_url();
        api.strip_suffix("/api").unwrap_or(api)
    }

    /// Check the settings before opening a session
    pub fn validate(&self) -> Result<(), RemoteError> {
        let url = self.api_url();
        if url.is_empty() {
            return Err(RemoteError::Connection("engine URL is empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RemoteError::Connection(format!(
                "engine URL must be http(s): {}",
                url
            )));
        }
        if self.username.is_empty() {
            return Err(RemoteError::Connection("username is empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(RemoteError::Connection(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("insecure", &self.insecure)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
