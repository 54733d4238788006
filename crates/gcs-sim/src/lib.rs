//! Simulated drone service.
//!
//! Wraps the `gcs-core` simulator in an owning tokio task and exposes it
//! behind the shared `DroneService` facade.

mod service;

pub use service::SimDroneService;
