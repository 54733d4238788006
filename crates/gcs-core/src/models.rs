//! Core data models shared by the simulated vehicle and the live bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position on the ground track. Altitude is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One mission waypoint. Uploaded as an ordered sequence; replacing the
/// sequence resets mission progress to the first element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    /// Target altitude in meters.
    pub altitude: f64,
    pub index: u32,
}

/// Proportional/integral/derivative gains for the tracking controller.
///
/// Only the proportional term drives the tracking law today; `i` and `d`
/// are accepted and carried but have no effect on any control output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

/// Operator-supplied vehicle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneConfig {
    /// Altitude ceiling in meters; the physics loop clamps to it.
    pub max_altitude: f64,
    /// Horizontal speed limit in m/s.
    pub max_speed: f64,
    /// Return-to-launch cruise altitude in meters.
    pub rth_altitude: f64,
    pub obstacle_avoidance_enabled: bool,
    /// Accepted for completeness; no control law enforces it.
    pub geofence_radius: f64,
    pub pid: PidGains,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            max_altitude: 120.0,
            max_speed: 15.0,
            rth_altitude: 30.0,
            obstacle_avoidance_enabled: true,
            geofence_radius: 500.0,
            pid: PidGains {
                p: 1.2,
                i: 0.05,
                d: 0.3,
            },
        }
    }
}

/// Partial configuration update. Unset fields leave the current value
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub max_altitude: Option<f64>,
    pub max_speed: Option<f64>,
    pub rth_altitude: Option<f64>,
    pub obstacle_avoidance_enabled: Option<bool>,
    pub geofence_radius: Option<f64>,
    pub pid: Option<PidGains>,
}

impl DroneConfig {
    /// Merge a partial update into this configuration.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(v) = patch.max_altitude {
            self.max_altitude = v;
        }
        if let Some(v) = patch.max_speed {
            self.max_speed = v;
        }
        if let Some(v) = patch.rth_altitude {
            self.rth_altitude = v;
        }
        if let Some(v) = patch.obstacle_avoidance_enabled {
            self.obstacle_avoidance_enabled = v;
        }
        if let Some(v) = patch.geofence_radius {
            self.geofence_radius = v;
        }
        if let Some(v) = patch.pid {
            self.pid = v;
        }
    }
}

/// Live vehicle state snapshot, pushed to subscribers once per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    /// Degrees, positive nose-up.
    pub pitch: f64,
    /// Degrees, positive right-wing-down.
    pub roll: f64,
    /// Degrees clockwise from north, normalized to [0, 360).
    pub yaw: f64,
    /// Meters above ground, clamped to [0, max_altitude].
    pub altitude: f64,
    /// Horizontal speed along the current heading, m/s.
    pub speed_h: f64,
    /// Vertical speed, m/s, positive climbing.
    pub speed_v: f64,
    /// Percentage in [0, 100]; non-increasing while armed.
    pub battery: f64,
    pub satellites: u32,
    pub coordinates: Coordinates,
    /// Meters from the home location captured at arming.
    pub distance_home: f64,
    /// Seconds since the most recent arm.
    pub flight_time: u64,
    /// Simulated forward depth-sensor reading in meters.
    pub obstacle_distance: f64,
    /// Camera gimbal pitch, clamped to [-90, +20] degrees.
    pub gimbal_pitch: f64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            altitude: 0.0,
            speed_h: 0.0,
            speed_v: 0.0,
            battery: 98.0,
            satellites: 12,
            coordinates: Coordinates {
                lat: 37.7749,
                lng: -122.4194,
            },
            distance_home: 0.0,
            flight_time: 0,
            obstacle_distance: 10.0,
            gimbal_pitch: 0.0,
        }
    }
}

/// A detection from the (simulated) vision pipeline. Regenerated every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    pub id: u32,
    pub label: String,
    pub confidence: f64,
    /// [x, y, width, height], normalized image coordinates in [0, 1].
    pub bbox: [f64; 4],
    /// Whether this detection is the active tracking target.
    pub tracking: bool,
}

impl DetectedObject {
    /// Normalized horizontal/vertical offset of the bbox center from the
    /// image center, each in [-0.5, 0.5].
    pub fn center_error(&self) -> (f64, f64) {
        let cx = self.bbox[0] + self.bbox[2] / 2.0;
        let cy = self.bbox[1] + self.bbox[3] / 2.0;
        (cx - 0.5, cy - 0.5)
    }
}

/// Active flight mode. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightMode {
    Manual,
    Stabilize,
    AltHold,
    Loiter,
    /// Return to the home location recorded at arming.
    Rtl,
    FollowMe,
    Orbit,
    AutoMission,
    Cinema,
}

/// Pre-programmed camera move, meaningful only while in CINEMA mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CinematicShotType {
    /// No shot selected; the rest state.
    None,
    OrbitLeft,
    OrbitRight,
    Dronie,
    Helix,
    /// Declared upstream but has no motion profile; selecting it holds
    /// the vehicle in the idle law.
    Rocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    WeakSignal,
}

/// Severity of an operator-facing log signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

/// Append-only log signal delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}
