//! Unified error types for StudyTrack.

use thiserror::Error;

/// Result type alias using StudyTrackError.
pub type Result<T> = std::result::Result<T, StudyTrackError>;

#[derive(Error, Debug)]
pub enum StudyTrackError {
    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Store errors
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Inbound request errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Channel errors
    #[error("Messaging failure: {0}")]
    Messaging(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl StudyTrackError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::DataAccess(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn messaging(msg: impl Into<String>) -> Self {
        Self::Messaging(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
