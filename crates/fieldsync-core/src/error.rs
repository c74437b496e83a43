//! Error types for fieldsync-core

use thiserror::Error;

/// Result type alias using fieldsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The host cannot provide a persistent store at all.
    ///
    /// Retrying is pointless; callers degrade to online-only mode.
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A single store operation aborted or errored.
    #[error("Store transaction failed: {0}")]
    Transaction(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue entry or pinned entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction or configuration error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
