//! fieldsync-core - Offline write queue for field-service clients
//!
//! This crate contains the durable local store, pin manager, connectivity
//! tracker, write interceptor and sync engine used by every Fieldsync host.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod pins;
pub mod services;
pub mod store;
pub mod sync;
mod task;
pub mod util;

pub use config::SyncSettings;
pub use connectivity::{ConnectivitySnapshot, ConnectivityTracker, NetworkMonitor, NetworkStatus};
pub use error::{Error, Result};
pub use interceptor::{SubmitError, SubmitOutcome, WriteInterceptor};
pub use models::{EntryId, NewSyncEntry, PinnedEntity, QueueStatus, SyncQueueEntry, MAX_RETRIES};
pub use pins::PinManager;
pub use services::OfflineSyncService;
pub use store::{LocalStore, QueueEvent};
pub use sync::{AutoDrain, DrainReport, EndpointResolver, HttpRemoteWriter, RemoteWriter, SyncEngine};
