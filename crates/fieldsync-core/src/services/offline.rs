//! Composition root wiring the offline write queue together.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SyncSettings;
use crate::connectivity::{ConnectivityTracker, NetworkMonitor};
use crate::interceptor::WriteInterceptor;
use crate::pins::PinManager;
use crate::store::LocalStore;
use crate::sync::{AutoDrain, DrainReport, EndpointResolver, HttpRemoteWriter, RemoteWriter, SyncEngine};
use crate::Result;

/// Owns one instance of every offline-sync component.
///
/// Hosts feed reachability through [`NetworkMonitor::set_status`] and call
/// [`start`](Self::start) / [`shutdown`](Self::shutdown) around their lifetime.
#[derive(Clone)]
pub struct OfflineSyncService {
    store: LocalStore,
    monitor: NetworkMonitor,
    tracker: ConnectivityTracker,
    pins: PinManager,
    interceptor: WriteInterceptor,
    engine: Arc<SyncEngine>,
    auto_drain: AutoDrain,
}

impl OfflineSyncService {
    /// Wire the components around an existing store and remote writer.
    pub fn new(
        store: LocalStore,
        monitor: NetworkMonitor,
        settings: &SyncSettings,
        remote: Arc<dyn RemoteWriter>,
    ) -> Self {
        let tracker =
            ConnectivityTracker::new(store.clone(), monitor.clone(), settings.poll_interval());
        let engine = Arc::new(
            SyncEngine::new(
                store.clone(),
                remote,
                EndpointResolver::from_settings(settings),
                settings.request_timeout(),
            )
            .with_tracker(tracker.clone()),
        );
        let auto_drain = AutoDrain::new(
            Arc::clone(&engine),
            monitor.clone(),
            settings.drain_interval(),
        );

        Self {
            pins: PinManager::new(store.clone()),
            interceptor: WriteInterceptor::new(
                store.clone(),
                monitor.clone(),
                settings.offline_notice(),
            ),
            store,
            monitor,
            tracker,
            engine,
            auto_drain,
        }
    }

    /// Wire the components with an HTTP remote writer and a store file at `db_path`.
    pub fn open_path(
        db_path: impl Into<PathBuf>,
        monitor: NetworkMonitor,
        settings: &SyncSettings,
    ) -> Result<Self> {
        let remote = Arc::new(HttpRemoteWriter::from_settings(settings)?);
        Ok(Self::new(
            LocalStore::at_path(db_path),
            monitor,
            settings,
            remote,
        ))
    }

    /// Open the store and start background tracking and auto-drain.
    pub async fn start(&self) -> Result<()> {
        self.store.open().await?;
        self.tracker.start();
        self.auto_drain.start();
        tracing::info!("Offline sync started");
        Ok(())
    }

    /// Stop background tasks and release the store.
    pub async fn shutdown(&self) {
        self.auto_drain.stop();
        self.tracker.stop();
        self.store.close().await;
        tracing::info!("Offline sync stopped");
    }

    /// Run one drain now.
    pub async fn process_queue(&self) -> Result<DrainReport> {
        self.engine.process_queue().await
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub const fn tracker(&self) -> &ConnectivityTracker {
        &self.tracker
    }

    pub const fn pins(&self) -> &PinManager {
        &self.pins
    }

    pub const fn interceptor(&self) -> &WriteInterceptor {
        &self.interceptor
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }
}
