//! Error types for siren

use thiserror::Error;

/// siren error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
