//! Cache layer errors.
//!
//! Cache failures never reach callers of the listing endpoints: they are
//! logged and the read is treated as a miss or the write is dropped.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Could not reach the backend or open a connection.
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend accepted the command but it failed.
    #[error("Cache command failed: {0}")]
    Command(String),

    /// The per-call deadline elapsed.
    #[error("Cache {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
            CacheError::Unavailable(e.to_string())
        } else {
            CacheError::Command(e.to_string())
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
