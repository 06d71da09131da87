//! Client error types.

use serde::Deserialize;

use crate::config::ClientConfigError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The request deadline elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server could not be reached or the connection broke.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A success response whose body did not match the envelope.
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Config(#[from] ClientConfigError),
}

impl ClientError {
    /// Network and timeout failures may succeed on a later attempt; anything
    /// the server answered, or failed to decode, will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Transport(_))
    }

    /// Build from a non-success response body, reading `{error, message, code}`
    /// when the server sent it.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => ClientError::Api {
                status,
                code: parsed.code,
                message: parsed
                    .message
                    .or(parsed.error)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            },
            Err(_) => ClientError::Api {
                status,
                code: None,
                message: if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                },
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(ClientConfigError::InvalidValue {
                field: "base_url",
                reason: err.to_string(),
            })
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Error body written by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    code: Option<String>,
}
