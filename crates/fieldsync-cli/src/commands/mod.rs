pub mod common;
pub mod config;
pub mod drain;
pub mod enqueue;
pub mod pins;
pub mod queue;
pub mod status;
pub mod submit;
pub mod watch;
