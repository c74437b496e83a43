//! Data models for Fieldsync

mod pinned;
mod queue_entry;

pub use pinned::PinnedEntity;
pub use queue_entry::{EntryId, NewSyncEntry, QueueStatus, SyncQueueEntry, MAX_RETRIES};
