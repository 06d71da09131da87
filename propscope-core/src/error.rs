//! Error types for PropScope operations

use thiserror::Error;

/// Advice attached to query timeouts.
pub const NARROW_FILTER_GUIDANCE: &str =
    "Query timed out. Try selecting fewer suburbs or a more specific filter.";

/// Data source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The statement exceeded the server-side statement timeout or the
    /// client-side query deadline.
    #[error("Query timed out during {operation}")]
    Timeout { operation: String },

    #[error("Data source error: {reason}")]
    Upstream { reason: String },
}

impl StoreError {
    pub fn timeout(operation: impl Into<String>) -> Self {
        StoreError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        StoreError::Upstream {
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout { .. })
    }

    /// Caller-facing message. Never contains the upstream reason.
    pub fn public_message(&self) -> &'static str {
        match self {
            StoreError::Timeout { .. } => NARROW_FILTER_GUIDANCE,
            StoreError::Upstream { .. } => "Failed to fetch properties from the data source.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
