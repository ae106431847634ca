//! Error types for JobFeed

use thiserror::Error;

/// Result type alias for JobFeed operations
pub type Result<T> = std::result::Result<T, JobfeedError>;

/// Main error type shared across JobFeed crates
#[derive(Error, Debug)]
pub enum JobfeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

impl JobfeedError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        JobfeedError::Config(message.into())
    }
}
