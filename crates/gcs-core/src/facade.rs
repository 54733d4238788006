//! The command/query contract shared by the simulated vehicle and the
//! live bridge.
//!
//! The view layer talks to a `dyn DroneService` and must not be able to
//! tell the two implementations apart.

use tokio::sync::broadcast;

use crate::models::{
    CinematicShotType, ConfigPatch, ConnectionStatus, DetectedObject, FlightMode, LogMessage,
    Telemetry, Waypoint,
};

/// One push notification to subscribers.
#[derive(Debug, Clone)]
pub enum DroneEvent {
    Telemetry(Telemetry),
    Objects(Vec<DetectedObject>),
    Log(LogMessage),
    Status(ConnectionStatus),
}

/// Vehicle command/query surface.
///
/// Every command is synchronous and fire-and-forget: it is handed to the
/// owning task and its effect becomes visible from the next tick's law
/// evaluation. Invalid commands degrade to a safe mode or a no-op; none
/// of them fail.
pub trait DroneService: Send + Sync {
    /// Begin emitting updates. Idempotent.
    fn connect(&self);

    /// Stop emitting updates. Idempotent.
    fn disconnect(&self);

    /// Register an observer. Dropping the receiver unsubscribes. A slow
    /// receiver lags and skips ahead; it never stalls the vehicle loop.
    fn subscribe(&self) -> broadcast::Receiver<DroneEvent>;

    /// Merge a partial configuration update; unset fields are untouched.
    fn update_config(&self, patch: ConfigPatch);

    fn set_armed(&self, armed: bool);

    fn set_flight_mode(&self, mode: FlightMode);

    fn set_cinematic_shot(&self, shot: CinematicShotType);

    /// Lock onto a detected object, or pass `None` to release the lock.
    fn set_tracked_object(&self, id: Option<u32>);

    /// Upload a mission, replacing any previous one and resetting
    /// progress to the first waypoint.
    fn set_waypoints(&self, waypoints: Vec<Waypoint>);

    /// Point the camera gimbal; values outside [-90, +20] are clamped.
    fn set_gimbal_pitch(&self, degrees: f64);
}
