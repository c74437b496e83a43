//! Delivery of queued writes to the remote API.

mod endpoints;
mod engine;
mod remote;
mod scheduler;

pub use endpoints::{EndpointResolver, DEFAULT_ENDPOINTS};
pub use engine::{DrainReport, SyncEngine};
pub use remote::{DeliveryError, HttpRemoteWriter, RemoteWriter};
pub use scheduler::AutoDrain;

#[cfg(test)]
pub(crate) use engine::testing;
