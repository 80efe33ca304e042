//! Error types for the mathroute routing core
//!
//! Domain failures that reach the caller are modelled as variants here.
//! Recoverable retrieval problems and guardrail vetoes on output are not
//! errors: they surface as degraded solutions instead.

use crate::types::SessionId;
use thiserror::Error;

/// Main error type for mathroute operations
#[derive(Error, Debug)]
pub enum RouterError {
    /// Input guardrail vetoed the question
    #[error("Input rejected: {}", .warnings.join("; "))]
    InputRejected { warnings: Vec<String> },

    /// A retriever failed or timed out
    #[error("Retrieval unavailable ({source_name}): {reason}")]
    RetrievalUnavailable { source_name: String, reason: String },

    /// Feedback referenced a session that does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Feedback was already accepted for this session
    #[error("Feedback already recorded for session: {0}")]
    DuplicateFeedback(SessionId),

    /// Rating outside the 1-5 scale
    #[error("Invalid rating {0}: expected a value between 1 and 5")]
    InvalidRating(u8),

    /// Structured evaluation score outside [0, 1] or not a number
    #[error("Invalid evaluation: {0} must be a number between 0 and 1")]
    InvalidEvaluation(String),

    /// State file written by a different format version
    #[error("Unsupported state file version {found} (expected {expected})")]
    UnsupportedStateVersion { found: u32, expected: u32 },

    /// Invalid session ID format
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(#[from] uuid::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected internal fault
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for mathroute operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Convert anyhow::Error to RouterError
impl From<anyhow::Error> for RouterError {
    fn from(err: anyhow::Error) -> Self {
        RouterError::Internal(err.to_string())
    }
}

impl RouterError {
    /// Whether the error is caused by the caller (bad input, unknown session)
    /// rather than by the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RouterError::InputRejected { .. }
                | RouterError::SessionNotFound(_)
                | RouterError::DuplicateFeedback(_)
                | RouterError::InvalidRating(_)
                | RouterError::InvalidEvaluation(_)
                | RouterError::InvalidSessionId(_)
        )
    }
}
