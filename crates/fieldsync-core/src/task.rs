//! Ownership of the background tasks started by the tracker and the auto-drain.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

/// Holds at most one running task and aborts it when dropped.
///
/// Owners keep the slot behind an `Arc` shared by their clones; the spawned
/// future must not hold that `Arc`, or the task would keep itself alive.
#[derive(Default)]
pub(crate) struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    /// Spawn `future` unless a task is already running. Returns whether it spawned.
    pub(crate) fn start<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }
        *handle = Some(tokio::spawn(future));
        true
    }

    /// Abort the task; returns whether one was held.
    pub(crate) fn stop(&self) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(task) = handle else {
            return false;
        };
        task.abort();
        true
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        let handle = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = handle {
            task.abort();
        }
    }
}
