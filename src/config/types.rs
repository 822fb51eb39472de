//! Configuration data types.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    DEFAULT_API_URL, DEFAULT_FILES_URL, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::api::RetryConfig;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backends: BackendsConfig,
    pub network: NetworkConfig,
    pub retry: RetryConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
}

/// Base addresses of the logical backend targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Primary application backend (`api` tag, and the default).
    pub api_url: String,
    /// File service backend (`files` tag).
    pub files_url: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            files_url: DEFAULT_FILES_URL.into(),
        }
    }
}

/// Network/HTTP timeout policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Upload pre-check limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// Static credentials used by the command-line front end.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub token: String,
    pub session_id: Option<String>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("session_id", &self.session_id.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
