//! Network reachability and the live pending-write count shown to the UI.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::store::LocalStore;
use crate::task::TaskSlot;

/// Host-reported reachability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
    /// The host cannot tell. Treated as online to avoid a false offline lockout.
    #[default]
    Unknown,
}

impl NetworkStatus {
    #[must_use]
    pub const fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// Source of online/offline transitions, fed by the host.
#[derive(Clone)]
pub struct NetworkMonitor {
    status: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            status: Arc::new(status),
        }
    }

    /// Report a reachability change; returns whether the status changed.
    pub fn set_status(&self, status: NetworkStatus) -> bool {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::info!("Network status changed to {status:?}");
        }
        changed
    }

    pub fn set_online(&self, online: bool) -> bool {
        self.set_status(if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        })
    }

    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::Unknown)
    }
}

/// Reactive view consumed by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivitySnapshot {
    pub is_online: bool,
    pub pending_sync: usize,
    /// Completion time (Unix ms) of the last drain without delivery failures.
    pub last_sync_at: Option<i64>,
}

/// Tracks reachability and the queue size.
///
/// While started, a background task polls the queue size on a fixed interval,
/// and also recounts on every queue change notification and status change.
/// The task is aborted when the last clone of the tracker is dropped.
#[derive(Clone)]
pub struct ConnectivityTracker {
    inner: Arc<TrackerInner>,
    task: Arc<TaskSlot>,
}

struct TrackerInner {
    store: LocalStore,
    monitor: NetworkMonitor,
    poll_interval: Duration,
    state: watch::Sender<ConnectivitySnapshot>,
}

impl ConnectivityTracker {
    pub fn new(store: LocalStore, monitor: NetworkMonitor, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(ConnectivitySnapshot {
            is_online: monitor.is_online(),
            ..ConnectivitySnapshot::default()
        });
        Self {
            inner: Arc::new(TrackerInner {
                store,
                monitor,
                poll_interval,
                state,
            }),
            task: Arc::default(),
        }
    }

    /// Start the background task. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let started = self.task.start(Arc::clone(&self.inner).run());
        if started {
            tracing::debug!("Connectivity tracker started");
        }
        started
    }

    /// Cancel the background task. Safe to call when not running.
    pub fn stop(&self) {
        if self.task.stop() {
            tracing::debug!("Connectivity tracker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.inner.state.subscribe()
    }

    /// Current reachability, read straight from the monitor.
    pub fn is_online(&self) -> bool {
        self.inner.monitor.is_online()
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.inner.monitor
    }

    /// Recount pending writes now.
    pub async fn refresh(&self) {
        self.inner.refresh_pending().await;
    }

    /// Record a drain that finished without delivery failures.
    pub fn record_sync(&self, at: i64) {
        self.inner
            .state
            .send_modify(|state| state.last_sync_at = Some(at));
    }
}

impl TrackerInner {
    async fn run(self: Arc<Self>) {
        let mut status = self.monitor.subscribe();
        let mut events = self.store.subscribe();
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.apply_status(*status.borrow_and_update());

        loop {
            tokio::select! {
                _ = poll.tick() => self.refresh_pending().await,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    self.apply_status(current);
                }
                event = events.recv() => match event {
                    Ok(_) | Err(RecvError::Lagged(_)) => self.refresh_pending().await,
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    fn apply_status(&self, status: NetworkStatus) {
        let online = status.is_online();
        self.state.send_if_modified(|state| {
            let changed = state.is_online != online;
            state.is_online = online;
            changed
        });
    }

    async fn refresh_pending(&self) {
        let pending = match self.store.queue_len().await {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!("Pending count poll failed, reporting empty queue: {error}");
                0
            }
        };
        self.state.send_if_modified(|state| {
            let changed = state.pending_sync != pending;
            state.pending_sync = pending;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSyncEntry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    const SLOW_POLL: Duration = Duration::from_secs(60);

    async fn wait_for(
        rx: &mut watch::Receiver<ConnectivitySnapshot>,
        predicate: impl FnMut(&ConnectivitySnapshot) -> bool,
    ) -> ConnectivitySnapshot {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("condition not reached")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_unknown_counts_as_online() {
        assert!(NetworkStatus::Unknown.is_online());
        assert!(NetworkStatus::Online.is_online());
        assert!(!NetworkStatus::Offline.is_online());
        assert!(NetworkMonitor::default().is_online());
    }

    #[test]
    fn test_set_status_reports_changes_only() {
        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));
        assert_eq!(monitor.status(), NetworkStatus::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initial_state_mirrors_monitor() {
        let tracker = ConnectivityTracker::new(
            LocalStore::in_memory(),
            NetworkMonitor::new(NetworkStatus::Offline),
            SLOW_POLL,
        );
        assert_eq!(tracker.snapshot(), ConnectivitySnapshot::default());
        assert!(!tracker.is_online());
        assert_eq!(tracker.monitor().status(), NetworkStatus::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pending_count_follows_queue_events() {
        let store = LocalStore::in_memory();
        let tracker =
            ConnectivityTracker::new(store.clone(), NetworkMonitor::default(), SLOW_POLL);
        let mut rx = tracker.subscribe();
        tracker.start();

        store
            .enqueue(NewSyncEntry::new("job-create", json!({})))
            .await
            .unwrap();
        store
            .enqueue(NewSyncEntry::new("job-note", json!({})))
            .await
            .unwrap();
        wait_for(&mut rx, |state| state.pending_sync == 2).await;

        store.clear_queue().await.unwrap();
        wait_for(&mut rx, |state| state.pending_sync == 0).await;
        tracker.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dropping_last_clone_ends_background_task() {
        let tracker = ConnectivityTracker::new(
            LocalStore::in_memory(),
            NetworkMonitor::default(),
            Duration::from_millis(10),
        );
        let mut rx = tracker.subscribe();
        let clone = tracker.clone();
        assert!(tracker.start());
        drop(tracker);
        assert!(clone.is_running());

        drop(clone);
        // The snapshot sender lives in state the task owns, so it closes once
        // the task is gone.
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_status_transitions_are_reflected() {
        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        let tracker =
            ConnectivityTracker::new(LocalStore::in_memory(), monitor.clone(), SLOW_POLL);
        let mut rx = tracker.subscribe();
        tracker.start();

        monitor.set_online(false);
        wait_for(&mut rx, |state| !state.is_online).await;
        monitor.set_online(true);
        wait_for(&mut rx, |state| state.is_online).await;
        tracker.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_poll_failure_resets_count() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let tracker = ConnectivityTracker::new(
            LocalStore::at_path(blocker.join("offline.db")),
            NetworkMonitor::default(),
            SLOW_POLL,
        );
        tracker
            .inner
            .state
            .send_modify(|state| state.pending_sync = 4);

        tracker.refresh().await;
        assert_eq!(tracker.snapshot().pending_sync, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_is_idempotent_and_stop_tears_down() {
        let tracker = ConnectivityTracker::new(
            LocalStore::in_memory(),
            NetworkMonitor::default(),
            Duration::from_millis(10),
        );
        assert!(tracker.start());
        assert!(!tracker.start());
        assert!(tracker.is_running());

        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_running());
        assert!(tracker.start());
        tracker.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_sync_sets_last_sync_at() {
        let tracker = ConnectivityTracker::new(
            LocalStore::in_memory(),
            NetworkMonitor::default(),
            SLOW_POLL,
        );
        tracker.record_sync(1_700_000_000_000);
        assert_eq!(tracker.snapshot().last_sync_at, Some(1_700_000_000_000));
    }
}
