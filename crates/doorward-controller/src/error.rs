//! Error types for the door controller process

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors that can occur while setting up the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] doorward_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written
    #[error("Configuration error: {0}")]
    ConfigParse(String),

    /// Replay file could not be loaded
    #[error("Replay error: {0}")]
    Replay(String),
}

impl From<toml::de::Error> for ControllerError {
    fn from(e: toml::de::Error) -> Self {
        ControllerError::ConfigParse(e.to_string())
    }
}

impl From<toml::ser::Error> for ControllerError {
    fn from(e: toml::ser::Error) -> Self {
        ControllerError::ConfigParse(e.to_string())
    }
}

impl From<serde_json::Error> for ControllerError {
    fn from(e: serde_json::Error) -> Self {
        ControllerError::Replay(e.to_string())
    }
}
