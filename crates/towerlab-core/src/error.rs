//! Error types for towerlab-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Level {index} out of range (ladder has {len} levels)")]
    LevelOutOfRange { index: usize, len: usize },

    #[error("Skin not found: {0}")]
    SkinNotFound(String),

    #[error("Cannot locate attribute {attribute} at level {level}")]
    Unlocatable { attribute: String, level: usize },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Dependency cycle between calculated fields: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
