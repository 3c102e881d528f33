//! Session core configuration with validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default API root, matching the server's `/api` mount.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Default persisted record key.
pub const DEFAULT_STORAGE_KEY: &str = "user";

/// Session core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// API root; endpoint paths are appended to it.
    pub api_base_url: String,
    /// Login entry point used for redirects and expiry navigation.
    pub login_path: String,
    /// Where a login returns to when no destination was recorded.
    pub home_path: String,
    /// Key of the persisted session record.
    pub storage_key: String,
    /// Directory for the file-backed store (None = caller decides).
    pub state_dir: Option<PathBuf>,
    /// Whole-request timeout.
    pub request_timeout_secs: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Re-read the persisted record before each access check, to pick up
    /// writes made by another process.
    pub reload_before_access_check: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            state_dir: None,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            reload_before_access_check: false,
        }
    }
}

impl SessionConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SD_API_URL`: API root (default: http://localhost:8080/api)
    /// - `SD_LOGIN_PATH`: login entry point (default: /login)
    /// - `SD_STORAGE_KEY`: persisted record key (default: user)
    /// - `SD_STATE_DIR`: file store directory (default: unset)
    /// - `SD_REQUEST_TIMEOUT_SECS`: request timeout (default: 5)
    /// - `SD_RELOAD_BEFORE_ACCESS_CHECK`: `true`/`1` to enable
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: lookup("SD_API_URL").unwrap_or(defaults.api_base_url),
            login_path: lookup("SD_LOGIN_PATH").unwrap_or(defaults.login_path),
            home_path: defaults.home_path,
            storage_key: lookup("SD_STORAGE_KEY").unwrap_or(defaults.storage_key),
            state_dir: lookup("SD_STATE_DIR").map(PathBuf::from),
            request_timeout_secs: lookup("SD_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            connect_timeout_secs: defaults.connect_timeout_secs,
            reload_before_access_check: lookup("SD_RELOAD_BEFORE_ACCESS_CHECK")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.reload_before_access_check),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }

        for path in [&self.login_path, &self.home_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }

        if self.storage_key.is_empty()
            || !self
                .storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidStorageKey(self.storage_key.clone()));
        }

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API base URL must be http(s): {0}")]
    InvalidBaseUrl(String),

    #[error("Path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Storage key must be non-empty and contain only [A-Za-z0-9_-]: {0}")]
    InvalidStorageKey(String),

    #[error("Timeouts cannot be 0")]
    InvalidTimeout,
}
