//! Durable local store shared by the pin manager, the write interceptor and the sync engine.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, MappedMutexGuard, Mutex, MutexGuard};

use crate::db::{
    Database, LibSqlPinRepository, LibSqlQueueRepository, PinRepository, QueueRepository,
    StoreLocation,
};
use crate::models::{EntryId, NewSyncEntry, PinnedEntity, QueueStatus, SyncQueueEntry};
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 64;

/// Change notification emitted after every successful queue mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Enqueued(EntryId),
    Updated(EntryId),
    Removed(EntryId),
    /// An unreadable row was deleted by its stored key.
    Purged(String),
    Cleared,
}

/// Thread-safe handle over the two local collections.
///
/// The database is opened lazily by the first operation. Concurrent first
/// callers wait on the same lock, so the file is never opened twice.
#[derive(Clone)]
pub struct LocalStore {
    location: StoreLocation,
    db: Arc<Mutex<Option<Database>>>,
    events: broadcast::Sender<QueueEvent>,
}

impl LocalStore {
    /// Create a store handle; nothing is opened until the first operation.
    pub fn new(location: StoreLocation) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            location,
            db: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Create a store backed by a database file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreLocation::File(path.into()))
    }

    /// Create a private in-memory store (primarily for tests).
    ///
    /// Closing an in-memory store discards its contents.
    pub fn in_memory() -> Self {
        Self::new(StoreLocation::Memory)
    }

    /// Open the store now instead of on first use. Idempotent.
    pub async fn open(&self) -> Result<()> {
        self.database().await.map(drop)
    }

    /// Whether a database handle is currently held.
    pub async fn is_open(&self) -> bool {
        self.db.lock().await.is_some()
    }

    /// Drop the database handle. The next operation reopens it.
    pub async fn close(&self) {
        if self.db.lock().await.take().is_some() {
            tracing::debug!("Closed local store");
        }
    }

    /// Subscribe to queue change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    async fn database(&self) -> Result<MappedMutexGuard<'_, Database>> {
        let mut slot = self.db.lock().await;
        if slot.is_none() {
            *slot = Some(self.location.open().await?);
        }
        MutexGuard::try_map(slot, Option::as_mut)
            .map_err(|_| Error::StorageUnavailable("local store is not open".to_string()))
    }

    fn notify(&self, event: QueueEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    // Pinned entities

    pub async fn put_pin(&self, pin: &PinnedEntity) -> Result<()> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection()).put(pin).await
    }

    pub async fn get_pin(&self, entity_id: &str) -> Result<Option<PinnedEntity>> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection()).get(entity_id).await
    }

    pub async fn pins(&self) -> Result<Vec<PinnedEntity>> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection()).list().await
    }

    pub async fn delete_pin(&self, entity_id: &str) -> Result<bool> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection())
            .delete(entity_id)
            .await
    }

    pub async fn clear_pins(&self) -> Result<()> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection()).clear().await
    }

    pub async fn pin_count(&self) -> Result<usize> {
        let db = self.database().await?;
        LibSqlPinRepository::new(db.connection()).count().await
    }

    // Sync queue

    /// Durably append a write to the queue.
    pub async fn enqueue(&self, entry: NewSyncEntry) -> Result<SyncQueueEntry> {
        let entry = SyncQueueEntry::from_new(entry);
        {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection())
                .insert(&entry)
                .await?;
        }
        tracing::debug!(id = %entry.id, kind = %entry.operation_type, "Queued write");
        self.notify(QueueEvent::Enqueued(entry.id));
        Ok(entry)
    }

    pub async fn get_entry(&self, id: &EntryId) -> Result<Option<SyncQueueEntry>> {
        let db = self.database().await?;
        LibSqlQueueRepository::new(db.connection()).get(id).await
    }

    /// All queued entries, oldest first.
    pub async fn queue_entries(&self) -> Result<Vec<SyncQueueEntry>> {
        let db = self.database().await?;
        LibSqlQueueRepository::new(db.connection()).list().await
    }

    /// Record a failed delivery in place.
    pub async fn record_failure(&self, id: &EntryId, attempts: u32, last_error: &str) -> Result<()> {
        {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection())
                .record_failure(id, attempts, last_error)
                .await?;
        }
        self.notify(QueueEvent::Updated(*id));
        Ok(())
    }

    /// Make a permanently failed entry eligible for delivery again.
    pub async fn reset_entry(&self, id: &EntryId) -> Result<()> {
        {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection())
                .reset_attempts(id)
                .await?;
        }
        self.notify(QueueEvent::Updated(*id));
        Ok(())
    }

    /// Delete one entry; returns whether it existed.
    pub async fn remove_entry(&self, id: &EntryId) -> Result<bool> {
        let removed = {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection())
                .delete(id)
                .await?
        };
        if removed {
            self.notify(QueueEvent::Removed(*id));
        }
        Ok(removed)
    }

    /// Delete a queue row by its raw stored key.
    ///
    /// Reaches rows that `queue_entries` skips because they cannot be parsed.
    pub async fn purge_entry(&self, key: &str) -> Result<bool> {
        let removed = {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection())
                .delete_key(key)
                .await?
        };
        if removed {
            tracing::info!("Purged queue row '{key}'");
            self.notify(QueueEvent::Purged(key.to_string()));
        }
        Ok(removed)
    }

    /// Delete every queued entry; returns how many were removed.
    pub async fn clear_queue(&self) -> Result<u64> {
        let removed = {
            let db = self.database().await?;
            LibSqlQueueRepository::new(db.connection()).clear().await?
        };
        tracing::info!("Cleared {removed} queued writes");
        self.notify(QueueEvent::Cleared);
        Ok(removed)
    }

    pub async fn queue_len(&self) -> Result<usize> {
        let db = self.database().await?;
        LibSqlQueueRepository::new(db.connection()).count().await
    }

    pub async fn queue_status(&self) -> Result<QueueStatus> {
        Ok(QueueStatus::from_entries(&self.queue_entries().await?))
    }

    /// Entries that reached the retry ceiling, oldest first.
    pub async fn failed_entries(&self) -> Result<Vec<SyncQueueEntry>> {
        let mut entries = self.queue_entries().await?;
        entries.retain(SyncQueueEntry::is_exhausted);
        Ok(entries)
    }

    #[cfg(test)]
    pub(crate) async fn execute_sql(&self, sql: &str) -> Result<u64> {
        let db = self.database().await?;
        Ok(db.connection().execute(sql, ()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_RETRIES;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_opens_lazily() {
        let store = LocalStore::in_memory();
        assert!(!store.is_open().await);

        assert_eq!(store.queue_len().await.unwrap(), 0);
        assert!(store.is_open().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_first_operations_share_one_open() {
        let tmp = tempdir().unwrap();
        let store = LocalStore::at_path(tmp.path().join("offline.db"));

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .enqueue(NewSyncEntry::new("job-create", json!({ "n": index })))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.queue_len().await.unwrap(), 8);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_then_reopen_keeps_data() {
        let tmp = tempdir().unwrap();
        let store = LocalStore::at_path(tmp.path().join("offline.db"));

        let entry = store
            .enqueue(NewSyncEntry::new("job-create", json!({"title": "Fix forklift"})))
            .await
            .unwrap();
        store
            .put_pin(&PinnedEntity::new("job-42", None))
            .await
            .unwrap();

        store.close().await;
        assert!(!store.is_open().await);

        assert_eq!(store.get_entry(&entry.id).await.unwrap(), Some(entry));
        assert_eq!(store.pin_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unavailable_location_fails_every_operation() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let store = LocalStore::at_path(blocker.join("offline.db"));

        assert!(matches!(
            store.queue_len().await,
            Err(Error::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.enqueue(NewSyncEntry::new("x", json!(1))).await,
            Err(Error::StorageUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_each_mutation_notifies_once() {
        let store = LocalStore::in_memory();
        let mut events = store.subscribe();

        let entry = store
            .enqueue(NewSyncEntry::new("job-create", json!({})))
            .await
            .unwrap();
        store.record_failure(&entry.id, 1, "HTTP 500").await.unwrap();
        store.remove_entry(&entry.id).await.unwrap();
        store.clear_queue().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), QueueEvent::Enqueued(entry.id));
        assert_eq!(events.recv().await.unwrap(), QueueEvent::Updated(entry.id));
        assert_eq!(events.recv().await.unwrap(), QueueEvent::Removed(entry.id));
        assert_eq!(events.recv().await.unwrap(), QueueEvent::Cleared);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_pins_leaves_queue_alone() {
        let store = LocalStore::in_memory();
        store
            .put_pin(&PinnedEntity::new("job-42", None))
            .await
            .unwrap();
        store
            .put_pin(&PinnedEntity::new("forklift-7", Some(json!({"model": "H25"}))))
            .await
            .unwrap();
        store
            .enqueue(NewSyncEntry::new("job-create", json!({})))
            .await
            .unwrap();

        store.clear_pins().await.unwrap();
        assert_eq!(store.pin_count().await.unwrap(), 0);
        assert!(store.pins().await.unwrap().is_empty());
        assert_eq!(store.queue_len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_purge_removes_unreadable_row() {
        let store = LocalStore::in_memory();
        let mut events = store.subscribe();
        store
            .execute_sql(
                "INSERT INTO sync_queue (id, type, payload, meta, created_at, attempts, last_error)
                 VALUES ('not-a-uuid', 'job-create', '{}', NULL, 1, 0, NULL)",
            )
            .await
            .unwrap();

        assert!(store.queue_entries().await.unwrap().is_empty());
        assert!(store.purge_entry("not-a-uuid").await.unwrap());
        assert!(!store.purge_entry("not-a-uuid").await.unwrap());
        assert_eq!(store.queue_len().await.unwrap(), 0);
        assert_eq!(
            events.recv().await.unwrap(),
            QueueEvent::Purged("not-a-uuid".to_string())
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_removing_missing_entry_is_silent() {
        let store = LocalStore::in_memory();
        let mut events = store.subscribe();

        assert!(!store.remove_entry(&EntryId::new()).await.unwrap());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_entries_and_status() {
        let store = LocalStore::in_memory();
        let stuck = store
            .enqueue(NewSyncEntry::new("job-create", json!({})))
            .await
            .unwrap();
        store
            .enqueue(NewSyncEntry::new("job-update", json!({})))
            .await
            .unwrap();
        store
            .record_failure(&stuck.id, MAX_RETRIES, "HTTP 500")
            .await
            .unwrap();

        let failed = store.failed_entries().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, stuck.id);

        let status = store.queue_status().await.unwrap();
        assert_eq!(status.pending, 2);
        assert_eq!(status.exhausted, 1);
        assert_eq!(status.oldest_created_at, Some(stuck.created_at));

        store.reset_entry(&stuck.id).await.unwrap();
        assert!(store.failed_entries().await.unwrap().is_empty());
    }
}
