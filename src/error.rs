//! Error types for the campus admin core.
//!
//! This module provides custom error types using `thiserror`. Every error is
//! local and recoverable: the admin can always retry the specific action.

use thiserror::Error;

/// Errors that can occur in the campus admin core.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Local contract violation detected before a write is attempted
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The external read or write failed; the message is passed through verbatim
    #[error("{0}")]
    Persistence(String),

    /// The authenticated session is no longer valid
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// A looked-up entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl ConsoleError {
    /// Short label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Persistence(_) => "persistence",
            Self::SessionExpired => "session_expired",
            Self::NotFound(_) => "not_found",
            Self::InvalidConfig(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) | Self::Yaml(_) | Self::Csv(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for Result with ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Other(err.to_string())
    }
}
