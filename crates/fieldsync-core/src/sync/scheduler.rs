//! Automatic drains: periodically while online, and once on every reconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::connectivity::NetworkMonitor;
use crate::task::TaskSlot;

use super::engine::SyncEngine;

/// Background driver for [`SyncEngine::process_queue`].
///
/// The task is aborted when the last clone is dropped.
#[derive(Clone)]
pub struct AutoDrain {
    engine: Arc<SyncEngine>,
    monitor: NetworkMonitor,
    interval: Duration,
    task: Arc<TaskSlot>,
}

impl AutoDrain {
    pub fn new(engine: Arc<SyncEngine>, monitor: NetworkMonitor, interval: Duration) -> Self {
        Self {
            engine,
            monitor,
            interval,
            task: Arc::default(),
        }
    }

    /// Start the timer and reconnect listener. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let started = self.task.start(run(
            Arc::clone(&self.engine),
            self.monitor.clone(),
            self.interval,
        ));
        if started {
            tracing::debug!("Auto-drain started every {:?}", self.interval);
        }
        started
    }

    /// Stop the timer and listener. Safe to call when not running.
    pub fn stop(&self) {
        if self.task.stop() {
            tracing::debug!("Auto-drain stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}

async fn run(engine: Arc<SyncEngine>, monitor: NetworkMonitor, period: Duration) {
    let mut status = monitor.subscribe();
    let mut was_online = status.borrow_and_update().is_online();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if monitor.is_online() {
                    drain(&engine, "interval").await;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = status.borrow_and_update().is_online();
                if online && !was_online {
                    drain(&engine, "reconnect").await;
                }
                was_online = online;
            }
        }
    }
}

async fn drain(engine: &SyncEngine, trigger: &str) {
    match engine.process_queue().await {
        Ok(report) => tracing::debug!(trigger, ?report, "Auto-drain pass complete"),
        Err(error) => tracing::warn!(trigger, "Auto-drain failed to read the queue: {error}"),
    }
}
