//! Service objects shared by client hosts.

mod offline;

pub use offline::OfflineSyncService;
