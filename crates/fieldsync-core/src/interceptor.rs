//! Offline-aware form submission.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::connectivity::NetworkMonitor;
use crate::models::{EntryId, NewSyncEntry};
use crate::store::LocalStore;

/// Outcome of a submission that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    /// The write ran online and returned this value.
    Completed(T),
    /// The host was offline; the write was queued and will sync later.
    SavedOffline(EntryId),
}

impl<T> SubmitOutcome<T> {
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::SavedOffline(_))
    }
}

/// Why a submission failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError<E> {
    /// The online write itself failed; it was not queued.
    #[error(transparent)]
    Write(E),
    /// The host was offline and the write could not be queued. Nothing was saved.
    #[error("could not save offline: {0}")]
    Enqueue(#[source] crate::Error),
}

/// Wraps writes with an offline fallback onto the sync queue.
#[derive(Clone)]
pub struct WriteInterceptor {
    store: LocalStore,
    monitor: NetworkMonitor,
    notice_window: Duration,
    notice: Arc<watch::Sender<bool>>,
    clear_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WriteInterceptor {
    pub fn new(store: LocalStore, monitor: NetworkMonitor, notice_window: Duration) -> Self {
        let (notice, _) = watch::channel(false);
        Self {
            store,
            monitor,
            notice_window,
            notice: Arc::new(notice),
            clear_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Submit `data` through `write` when online, or queue it as `operation_type` when offline.
    ///
    /// Online failures are returned unchanged and never queued. Offline, `write`
    /// is not called at all.
    pub async fn submit<T, E, F, Fut>(
        &self,
        operation_type: &str,
        data: Value,
        write: F,
    ) -> Result<SubmitOutcome<T>, SubmitError<E>>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.monitor.is_online() {
            return write(data)
                .await
                .map(SubmitOutcome::Completed)
                .map_err(SubmitError::Write);
        }

        let entry = self
            .store
            .enqueue(NewSyncEntry::new(operation_type, data))
            .await
            .map_err(|error| {
                tracing::error!("Offline save of {operation_type} failed: {error}");
                SubmitError::Enqueue(error)
            })?;

        tracing::info!("Saved {operation_type} offline as {}", entry.id);
        self.show_notice();
        Ok(SubmitOutcome::SavedOffline(entry.id))
    }

    /// Whether the "saved offline, pending sync" indicator is showing.
    pub fn notice_visible(&self) -> bool {
        *self.notice.borrow()
    }

    pub fn subscribe_notice(&self) -> watch::Receiver<bool> {
        self.notice.subscribe()
    }

    fn show_notice(&self) {
        self.notice.send_replace(true);

        let notice = Arc::clone(&self.notice);
        let window = self.notice_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            notice.send_replace(false);
        });

        let previous = self
            .clear_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}
