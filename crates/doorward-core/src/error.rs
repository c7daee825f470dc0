//! Error types for the Doorward core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the normal grant/deny flow
///
/// Denied attempts are never errors; they are reported through
/// [`AttemptOutcome`](crate::AttemptOutcome) and
/// [`ChallengeOutcome`](crate::ChallengeOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Access policy or credential configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// Roster or gallery is malformed
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// PIN secret could not be parsed
    #[error("Invalid PIN secret: {0}")]
    InvalidPinSecret(String),

    /// Event log row could not be parsed
    #[error("Invalid log record: {0}")]
    InvalidLogRecord(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
