//! Database layer for Fieldsync

mod connection;
mod migrations;
mod pin_repository;
mod queue_repository;

pub use connection::{Database, StoreLocation};
pub use pin_repository::{LibSqlPinRepository, PinRepository};
pub use queue_repository::{LibSqlQueueRepository, QueueRepository};
