//! Error types for the triage pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the triage library.
#[derive(Debug, Error)]
pub enum TriageError {
    /// No record with this identifier exists in the result store
    #[error("Test run not found: {id}")]
    NotFound { id: String },

    /// Configuration file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for [`crate::config::TriageConfig`]
    #[error("Failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for triage operations.
pub type Result<T> = std::result::Result<T, TriageError>;
