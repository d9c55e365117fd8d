//! Error types for rollcall-core

use thiserror::Error;

/// Result type alias using rollcall-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rollcall-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Participant id did not resolve against a fresh read
    #[error("Participant not found: {0}")]
    NotFound(String),

    /// Check-in was already recorded for this participant
    #[error("Participant is already checked in: {0}")]
    AlreadyCheckedIn(String),

    /// Undo requested for a participant that has no check-in to revert
    #[error("Participant is not checked in: {0}")]
    NotCheckedIn(String),

    /// Undo window has closed
    #[error("Cannot undo check-in for {participant_id}: {elapsed_ms}ms elapsed, limit is {limit_ms}ms")]
    UndoExpired {
        participant_id: String,
        elapsed_ms: i64,
        limit_ms: i64,
    },

    /// A write was attempted without a known target
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Non-success HTTP response from the tabular store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unauthorized or forbidden response from the tabular store
    #[error("Authorization error: {0}")]
    Auth(String),

    /// The tabular store could not be reached
    #[error("Offline: {0}")]
    Offline(String),

    /// The request to the tabular store timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a later attempt may succeed without any change on our side.
    ///
    /// Only connectivity loss and timeouts qualify; the offline queue stops
    /// draining on these and keeps the operation for the next pass.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Offline(_) | Self::Timeout(_))
    }

    /// Permanent rejection by a check-in rule; retrying will not help.
    pub const fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::AlreadyCheckedIn(_)
                | Self::NotCheckedIn(_)
                | Self::UndoExpired { .. }
                | Self::PreconditionFailed(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::Offline(error.to_string())
        } else if error.is_decode() {
            Self::Transport(format!("invalid response body: {error}"))
        } else {
            Self::Transport(error.to_string())
        }
    }
}
