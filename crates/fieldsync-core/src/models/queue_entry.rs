//! Sync queue entry model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Delivery attempts after which an entry is skipped by every drain.
pub const MAX_RETRIES: u32 = 5;

/// A unique identifier for a queued write, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A write to enqueue: the operation tag, the body, and optional side data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSyncEntry {
    /// Operation type, e.g. `job-create`
    pub operation_type: String,
    /// Body POSTed to the remote endpoint (`Value::Null` when absent)
    pub payload: Value,
    /// Local-only context, never sent to the server
    pub meta: Option<Value>,
}

impl NewSyncEntry {
    /// Create a new write with no meta
    #[must_use]
    pub fn new(operation_type: impl Into<String>, payload: Value) -> Self {
        Self {
            operation_type: operation_type.into(),
            payload,
            meta: None,
        }
    }

    /// Attach local-only meta data
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A pending write stored in the sync queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    /// Unique identifier
    pub id: EntryId,
    /// Operation type used for endpoint routing
    #[serde(rename = "type")]
    pub operation_type: String,
    /// Opaque request body
    pub payload: Value,
    /// Local-only side data
    pub meta: Option<Value>,
    /// Enqueue timestamp (Unix ms), defines processing order
    pub created_at: i64,
    /// Failed delivery attempts so far
    pub attempts: u32,
    /// Most recent failure reason
    pub last_error: Option<String>,
}

impl SyncQueueEntry {
    /// Build a fresh entry (zero attempts) from a new write
    #[must_use]
    pub fn from_new(entry: NewSyncEntry) -> Self {
        Self {
            id: EntryId::new(),
            operation_type: entry.operation_type,
            payload: entry.payload,
            meta: entry.meta,
            created_at: crate::util::now_millis(),
            attempts: 0,
            last_error: None,
        }
    }

    /// Whether this entry reached the retry ceiling
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= MAX_RETRIES
    }

    /// Attempt count after one more failure, capped at the ceiling
    #[must_use]
    pub fn next_attempts(&self) -> u32 {
        self.attempts.saturating_add(1).min(MAX_RETRIES)
    }
}

/// Summary of the queue for status displays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Total entries in the queue
    pub pending: usize,
    /// Entries at the retry ceiling
    pub exhausted: usize,
    /// Enqueue timestamp of the oldest entry (Unix ms)
    pub oldest_created_at: Option<i64>,
}

impl QueueStatus {
    /// Compute a summary from a queue listing
    #[must_use]
    pub fn from_entries(entries: &[SyncQueueEntry]) -> Self {
        Self {
            pending: entries.len(),
            exhausted: entries.iter().filter(|entry| entry.is_exhausted()).count(),
            oldest_created_at: entries.iter().map(|entry| entry.created_at).min(),
        }
    }
}
