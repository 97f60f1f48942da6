//! Error types for the Rivet engine
//!
//! One crate-wide error enum with structured variants. Collaborator
//! boundaries (retrieval, gap logging, forum search) return these kinds so
//! callers can branch on them instead of catching blindly.

use thiserror::Error;

/// Main error type for the Rivet routing and research engine
#[derive(Error, Debug)]
pub enum RivetError {
    /// Request rejected before any routing work
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// State machine transition errors
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Knowledge store (vector search) errors
    #[error("Knowledge store error: {0}")]
    Knowledge(String),

    /// Retrieval errors (both semantic and keyword paths failed)
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Forum provider errors
    #[error("Forum provider '{provider}' failed: {message}")]
    ForumProvider { provider: String, message: String },

    /// Rate limiting signalled by a provider (HTTP 429 / exhausted quota)
    #[error("Provider '{provider}' rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Timeout errors
    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Gap / fingerprint / queue storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (fatal at startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("Engine error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RivetError>;

/// Convert anyhow errors from adapter code
impl From<anyhow::Error> for RivetError {
    fn from(err: anyhow::Error) -> Self {
        RivetError::Internal(err.to_string())
    }
}

impl RivetError {
    /// True for errors that a retry policy may reasonably retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RivetError::RateLimited { .. } | RivetError::Timeout { .. } | RivetError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RivetError::Timeout {
            operation: "forum_search".to_string(),
            duration_ms: 15000,
        };
        assert!(err.to_string().contains("forum_search"));
        assert!(err.to_string().contains("15000"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = RivetError::InvalidTransition {
            from: "Done".to_string(),
            to: "Scraping".to_string(),
            reason: "terminal state".to_string(),
        };
        assert!(err.to_string().contains("Done"));
        assert!(err.to_string().contains("Scraping"));
    }

    #[test]
    fn test_rate_limited_is_retryable() {
        let err = RivetError::RateLimited {
            provider: "stackoverflow".to_string(),
            retry_after_secs: Some(30),
        };
        assert!(err.is_retryable());
        assert!(!RivetError::Config("bad".to_string()).is_retryable());
    }
}
