//! Client configuration structures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_EXPIRY_SKEW_SECS, DEFAULT_KEYCHAIN_SERVICE,
    DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::{GeoQuestError, Platform, Result};

/// Configuration for the request pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root including the version prefix, e.g. `https://host/api/v1`
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    /// Tolerance applied when deciding whether an access token has expired
    pub expiry_skew_secs: i64,
    pub platform: Platform,
    /// Stable per-install id; generated and persisted when absent
    pub device_id: Option<String>,
    pub keychain_service: String,
    pub user_agent: Option<String>,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            expiry_skew_secs: DEFAULT_EXPIRY_SKEW_SECS,
            platform: Platform::current(),
            device_id: None,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            user_agent: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    /// Reject configurations the pipeline cannot run with.
    ///
    /// # Errors
    /// Returns `GeoQuestError::Config` for an empty or non-http(s) base URL
    /// and for zero timeouts.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(GeoQuestError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(GeoQuestError::Config(format!(
                "base_url must start with http:// or https://, got {base}"
            )));
        }
        if self.request_timeout_secs == 0 || self.refresh_timeout_secs == 0 {
            return Err(GeoQuestError::Config("timeouts must be greater than zero".into()));
        }
        if self.expiry_skew_secs < 0 {
            return Err(GeoQuestError::Config("expiry_skew_secs must not be negative".into()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
