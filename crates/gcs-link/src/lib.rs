//! Live vehicle bridge.
//!
//! Implements the shared `DroneService` facade by relaying command frames
//! to, and decoding partial updates from, a WebSocket vehicle bridge. The
//! view layer cannot tell this apart from the simulated service.

pub mod service;
pub mod wire;

pub use service::{LinkDroneService, LinkError};
pub use wire::{CommandFrame, UpdateFrame};
