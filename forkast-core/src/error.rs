//! Error types for the Forkast stack

use thiserror::Error;

/// Stack-wide error type
///
/// Validation and Auth errors are rejected before any network call and
/// carry messages safe to surface verbatim. Network/Timeout cover
/// transport failures and are never retried automatically. Protocol
/// indicates a bug (bad recovery id, unexpected response shape) and is
/// surfaced generically.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        CoreError::Auth(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        CoreError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        CoreError::Network(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        CoreError::Timeout(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        CoreError::Protocol(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Config(msg.into())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        // Distinguish a timed-out fetch from other transport failures so
        // callers never have to string-match on "not found" vs "timed out".
        if err.is_timeout() {
            CoreError::Timeout(err.to_string())
        } else {
            CoreError::Network(err.to_string())
        }
    }
}

/// Result type alias for Forkast operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::validation("Amount must be positive");
        assert_eq!(err.to_string(), "Validation error: Amount must be positive");

        let err = CoreError::timeout("deadline exceeded");
        assert_eq!(err.to_string(), "Request timed out: deadline exceeded");
    }
}
