//! Queue drain with per-entry bounded retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connectivity::ConnectivityTracker;
use crate::models::SyncQueueEntry;
use crate::store::LocalStore;
use crate::util::{duration_millis, now_millis};
use crate::Result;

use super::endpoints::EndpointResolver;
use super::remote::{DeliveryError, RemoteWriter};

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Entries delivered and removed
    pub synced: usize,
    /// Entries that failed delivery or were skipped at the retry ceiling
    pub failed: usize,
    /// Queue size after the drain
    pub remaining: usize,
    /// Subset of `failed` skipped for having reached the retry ceiling
    pub exhausted: usize,
}

impl DrainReport {
    /// Whether any eligible entry failed delivery during this drain.
    pub const fn had_delivery_failures(&self) -> bool {
        self.failed > self.exhausted
    }
}

/// Drains the sync queue against the remote endpoint.
///
/// Only one drain runs at a time per engine. The guard is in-process; two
/// processes sharing one store file can still drain concurrently.
pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteWriter>,
    endpoints: EndpointResolver,
    request_timeout: Duration,
    tracker: Option<ConnectivityTracker>,
    draining: AtomicBool,
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteWriter>,
        endpoints: EndpointResolver,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            remote,
            endpoints,
            request_timeout,
            tracker: None,
            draining: AtomicBool::new(false),
        }
    }

    /// Report clean drains to `tracker` as its last sync time.
    #[must_use]
    pub fn with_tracker(mut self, tracker: ConnectivityTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    /// Deliver every eligible entry, oldest first.
    ///
    /// Per-entry failures are recorded on the entry and counted in the report.
    /// Only a failed queue read returns `Err`.
    pub async fn process_queue(&self) -> Result<DrainReport> {
        let Some(_guard) = self.try_begin() else {
            let remaining = self.store.queue_len().await?;
            tracing::debug!("Drain already in progress, {remaining} entries queued");
            return Ok(DrainReport {
                remaining,
                ..DrainReport::default()
            });
        };

        let entries = self.store.queue_entries().await?;
        let mut report = DrainReport::default();

        for entry in entries {
            if entry.is_exhausted() {
                report.failed += 1;
                report.exhausted += 1;
                continue;
            }

            match self.deliver(&entry).await {
                Ok(()) => {
                    report.synced += 1;
                    tracing::debug!(id = %entry.id, kind = %entry.operation_type, "Delivered queued write");
                    if let Err(error) = self.store.remove_entry(&entry.id).await {
                        tracing::warn!("Delivered {} but could not remove it: {error}", entry.id);
                    }
                }
                Err(failure) => {
                    report.failed += 1;
                    let attempts = entry.next_attempts();
                    tracing::debug!(
                        id = %entry.id,
                        kind = %entry.operation_type,
                        attempts,
                        "Delivery failed: {failure}"
                    );
                    if let Err(error) = self
                        .store
                        .record_failure(&entry.id, attempts, &failure.to_string())
                        .await
                    {
                        tracing::warn!("Could not record failure for {}: {error}", entry.id);
                    }
                }
            }
        }

        report.remaining = self.store.queue_len().await?;

        if report.synced > 0 || report.failed > 0 {
            tracing::info!(
                "Drain finished: {} synced, {} failed ({} exhausted), {} remaining",
                report.synced,
                report.failed,
                report.exhausted,
                report.remaining
            );
        }

        if !report.had_delivery_failures() {
            if let Some(tracker) = &self.tracker {
                tracker.record_sync(now_millis());
            }
        }

        Ok(report)
    }

    async fn deliver(&self, entry: &SyncQueueEntry) -> std::result::Result<(), DeliveryError> {
        let url = self
            .endpoints
            .resolve(&entry.operation_type)
            .map_err(|error| DeliveryError::Unroutable(error.to_string()))?;

        tokio::time::timeout(
            self.request_timeout,
            self.remote.post_json(&url, &entry.payload),
        )
        .await
        .unwrap_or_else(|_| {
            Err(DeliveryError::Timeout(duration_millis(
                self.request_timeout,
            )))
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{GatedRemote, HangingRemote, RecordingRemote, StatusRemote};
    use super::*;
    use crate::connectivity::NetworkMonitor;
    use crate::models::{NewSyncEntry, MAX_RETRIES};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn resolver() -> EndpointResolver {
        EndpointResolver::new(
            Some("https://api.example.com".to_string()),
            &BTreeMap::new(),
        )
    }

    fn engine(store: &LocalStore, remote: Arc<dyn RemoteWriter>) -> SyncEngine {
        SyncEngine::new(store.clone(), remote, resolver(), Duration::from_secs(5))
    }

    async fn enqueue(store: &LocalStore, kind: &str, payload: serde_json::Value) -> SyncQueueEntry {
        store
            .enqueue(NewSyncEntry::new(kind, payload))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreadable_row_does_not_block_drain() {
        let store = LocalStore::in_memory();
        let remote = Arc::new(RecordingRemote::default());
        let engine = engine(&store, remote.clone());

        store
            .execute_sql(
                "INSERT INTO sync_queue (id, type, payload, meta, created_at, attempts, last_error)
                 VALUES ('not-a-uuid', 'job-create', '{}', NULL, 1, 0, NULL)",
            )
            .await
            .unwrap();
        enqueue(&store, "job-create", json!({"title": "Fix forklift"})).await;

        let report = engine.process_queue().await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.remaining, 1);
        assert_eq!(remote.bodies(), vec![json!({"title": "Fix forklift"})]);

        assert!(store.purge_entry("not-a-uuid").await.unwrap());
        assert_eq!(store.queue_len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drains_in_fifo_order() {
        let store = LocalStore::in_memory();
        let remote = Arc::new(RecordingRemote::default());
        let engine = engine(&store, remote.clone());

        enqueue(&store, "job-create", json!({"n": "A"})).await;
        enqueue(&store, "job-note", json!({"n": "B"})).await;
        enqueue(&store, "invoice-create", json!({"n": "C"})).await;

        let report = engine.process_queue().await.unwrap();
        assert_eq!(
            report,
            DrainReport {
                synced: 3,
                failed: 0,
                remaining: 0,
                exhausted: 0,
            }
        );
        assert_eq!(
            remote.bodies(),
            vec![json!({"n": "A"}), json!({"n": "B"}), json!({"n": "C"})]
        );

        let urls = remote
            .posts
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/rest/jobs",
                "https://api.example.com/rest/job-notes",
                "https://api.example.com/rest/invoices",
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_repeated_failures_record_attempts() {
        let store = LocalStore::in_memory();
        let engine = engine(&store, Arc::new(StatusRemote(500)));
        let entry = enqueue(&store, "job-create", json!({"title": "Fix forklift"})).await;

        for _ in 0..3 {
            let report = engine.process_queue().await.unwrap();
            assert_eq!(report.failed, 1);
            assert_eq!(report.remaining, 1);
        }

        let stored = store.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 3);
        assert_eq!(stored.last_error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retries_stop_at_ceiling() {
        let store = LocalStore::in_memory();
        let remote = Arc::new(RecordingRemote::failing_first(100));
        let engine = engine(&store, remote.clone());
        let entry = enqueue(&store, "job-create", json!({})).await;

        for _ in 0..MAX_RETRIES {
            engine.process_queue().await.unwrap();
        }
        let stored = store.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, MAX_RETRIES);

        let report = engine.process_queue().await.unwrap();
        assert_eq!(
            report,
            DrainReport {
                synced: 0,
                failed: 1,
                remaining: 1,
                exhausted: 1,
            }
        );
        assert_eq!(
            remote.posts.lock().unwrap().len(),
            usize::try_from(MAX_RETRIES).unwrap()
        );

        let stored = store.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, MAX_RETRIES);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_entry_keeps_its_place() {
        let store = LocalStore::in_memory();
        let remote = Arc::new(RecordingRemote::failing_first(1));
        let engine = engine(&store, remote.clone());

        let first = enqueue(&store, "job-create", json!({"n": "A"})).await;
        enqueue(&store, "job-update", json!({"n": "B"})).await;

        let report = engine.process_queue().await.unwrap();
        assert_eq!((report.synced, report.failed), (1, 1));

        let stored = store.get_entry(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.attempts, 1);

        enqueue(&store, "job-update", json!({"n": "C"})).await;
        engine.process_queue().await.unwrap();

        assert_eq!(
            remote.bodies(),
            vec![
                json!({"n": "A"}),
                json!({"n": "B"}),
                json!({"n": "A"}),
                json!({"n": "C"}),
            ]
        );
        assert_eq!(store.queue_len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_drain_returns_immediately() {
        let store = LocalStore::in_memory();
        let remote = Arc::new(GatedRemote::default());
        let engine = Arc::new(engine(&store, remote.clone()));
        enqueue(&store, "job-create", json!({})).await;
        enqueue(&store, "job-note", json!({})).await;

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.process_queue().await }
        });
        remote.entered.notified().await;
        assert!(engine.is_draining());

        let second = engine.process_queue().await.unwrap();
        assert_eq!(
            second,
            DrainReport {
                synced: 0,
                failed: 0,
                remaining: 2,
                exhausted: 0,
            }
        );

        remote.release.notify_one();
        remote.entered.notified().await;
        remote.release.notify_one();

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.synced, 2);
        assert_eq!(*remote.calls.lock().unwrap(), 2);
        assert!(!engine.is_draining());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hung_delivery_times_out() {
        let store = LocalStore::in_memory();
        let engine = SyncEngine::new(
            store.clone(),
            Arc::new(HangingRemote),
            resolver(),
            Duration::from_millis(50),
        );
        let entry = enqueue(&store, "job-create", json!({})).await;

        let report = tokio::time::timeout(Duration::from_secs(5), engine.process_queue())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.failed, 1);

        let stored = store.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.last_error.as_deref(), Some("timed out after 50 ms"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unroutable_entry_is_a_failed_delivery() {
        let store = LocalStore::in_memory();
        let engine = SyncEngine::new(
            store.clone(),
            Arc::new(RecordingRemote::default()),
            EndpointResolver::new(None, &BTreeMap::new()),
            Duration::from_secs(5),
        );
        let entry = enqueue(&store, "job-create", json!({})).await;

        let report = engine.process_queue().await.unwrap();
        assert_eq!(report.failed, 1);
        let stored = store.get_entry(&entry.id).await.unwrap().unwrap();
        assert!(stored
            .last_error
            .unwrap()
            .contains("no API base URL configured"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clean_drain_records_last_sync() {
        let store = LocalStore::in_memory();
        let tracker = crate::connectivity::ConnectivityTracker::new(
            store.clone(),
            NetworkMonitor::default(),
            Duration::from_secs(60),
        );
        let failing = engine(&store, Arc::new(StatusRemote(503))).with_tracker(tracker.clone());
        let entry = enqueue(&store, "job-create", json!({})).await;

        failing.process_queue().await.unwrap();
        assert_eq!(tracker.snapshot().last_sync_at, None);

        store.remove_entry(&entry.id).await.unwrap();
        failing.process_queue().await.unwrap();
        assert!(tracker.snapshot().last_sync_at.is_some());
    }
}
