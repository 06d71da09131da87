//! Client configuration, loaded from TOML or assembled in code.
//!
//! ```toml
//! base_url = "http://localhost:3000"
//! request_timeout_ms = 10000
//! page_size = 9
//!
//! [retry]
//! max_retries = 2
//! initial_backoff_ms = 500
//! multiplier = 2.0
//! max_backoff_ms = 4000
//! ```

use std::path::Path;
use std::time::Duration;

use propscope_core::MAX_PAGE_SIZE;
use serde::Deserialize;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("Failed to parse config TOML: {0}")]
    Parse(String),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    propscope_core::DEFAULT_PAGE_SIZE
}

impl ClientConfig {
    /// Defaults for everything but the server address.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            page_size: default_page_size(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_path(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ClientConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ClientConfigError> {
        let config: ClientConfig =
            toml::from_str(contents).map_err(|e| ClientConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientConfigError::InvalidValue {
                field: "base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ClientConfigError::InvalidValue {
                field: "page_size",
                reason: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() -> Result<(), ClientConfigError> {
        let config = ClientConfig::from_toml_str(r#"base_url = "http://localhost:3000""#)?;
        assert_eq!(config, ClientConfig::new("http://localhost:3000"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.page_size, 9);
        Ok(())
    }

    #[test]
    fn test_full_toml() -> Result<(), ClientConfigError> {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://api.propscope.example"
            request_timeout_ms = 2500
            page_size = 20

            [retry]
            max_retries = 4
            initial_backoff_ms = 100
            multiplier = 3.0
            max_backoff_ms = 1000
            "#,
        )?;
        assert_eq!(config.page_size, 20);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ClientConfig::from_toml_str("base_url = \"http://x\"\ntenant = 1");
        assert!(matches!(err, Err(ClientConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ClientConfig::new(""),
            ClientConfig::new("localhost:3000"),
            ClientConfig::new("http://x").with_page_size(0),
            ClientConfig::new("http://x").with_page_size(51),
            ClientConfig::new("http://x").with_request_timeout(Duration::ZERO),
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }
}
