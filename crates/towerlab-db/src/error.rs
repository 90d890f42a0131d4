//! Error types for persistence and managers.

use thiserror::Error;

/// Errors that can occur while loading, saving or managing entities.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Entity or skin not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity data rejected by the core.
    #[error(transparent)]
    Core(#[from] towerlab_core::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] ron::error::SpannedError),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
