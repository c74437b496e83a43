use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Operation type cannot be empty")]
    EmptyOperationType,
    #[error("Entity ID cannot be empty")]
    EmptyEntityId,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Invalid JSON in {0}")]
    InvalidJson(String),
    #[error("No payload provided; pass JSON as an argument or pipe it on stdin")]
    MissingPayload,
    #[error("Queue entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error("Not pinned: {0}")]
    NotPinned(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Could not save offline; nothing was stored: {0}")]
    OfflineSaveFailed(String),
    #[error("Refusing to clear the queue without --yes")]
    ClearNotConfirmed,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No API base URL configured. Run `fieldsync config init --api-base-url <URL>` or set FIELDSYNC_API_BASE_URL."
    )]
    ApiNotConfigured,
}
