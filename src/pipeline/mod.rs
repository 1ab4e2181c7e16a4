//! Pipeline components for the watcher.
//!
//! - `dedup`: process-lifetime set of already processed items
//! - `tracker`: per-service request state and the snapshot logger
//! - `poll`: the polling loop tying the services together

pub mod dedup;
pub mod poll;
pub mod tracker;

pub use dedup::SeenSet;
pub use poll::{CycleReport, Poller};
pub use tracker::{
    RequestTracker, Service, ServiceState, ServiceStatus, format_snapshot, spawn_snapshot_logger,
};
