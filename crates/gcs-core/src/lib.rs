//! Vehicle simulation core for the drone ground-control system.
//!
//! Pure domain logic: geodesy, the telemetry data model, the flight-mode
//! state machine, the tick-driven control/physics simulator, and the
//! facade contract both the simulated service and the live bridge
//! implement.

mod control;
pub mod facade;
pub mod geo;
pub mod models;
pub mod modes;
pub mod sim;

pub use facade::{DroneEvent, DroneService};
pub use models::{
    CinematicShotType, ConfigPatch, ConnectionStatus, Coordinates, DetectedObject, DroneConfig,
    FlightMode, LogLevel, LogMessage, PidGains, Telemetry, Waypoint,
};
pub use modes::ModeMachine;
pub use sim::{Simulator, TickOutput, TICK_INTERVAL};
