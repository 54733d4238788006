//! Per-mode control laws.
//!
//! Exactly one law runs per tick, picked by precedence: mission, then
//! RTL, then target tracking, then the active cinematic shot, then the
//! idle hover stabilizer.

use crate::geo;
use crate::models::{
    CinematicShotType, Coordinates, DetectedObject, FlightMode, LogLevel, LogMessage,
};
use crate::sim::{clamp_gimbal, Simulator};

/// Fraction of the heading error applied per tick.
const YAW_EASE: f64 = 0.1;

/// Vertical-speed gain on mission altitude error, m/s per meter.
const MISSION_CLIMB_GAIN: f64 = 0.5;

/// Horizontal capture radius for waypoints and the home point, meters.
const CAPTURE_RADIUS_M: f64 = 2.0;

/// Return-to-launch cruise speed cap, m/s.
const RTL_SPEED_MPS: f64 = 8.0;

/// Per-tick easing of altitude toward the RTH altitude.
const RTL_ALT_EASE: f64 = 0.05;

/// Final descent rate, m/s.
const LANDING_RATE_MPS: f64 = -1.0;

/// Altitude below which the RTL law considers the vehicle landed.
const LANDED_ALT_M: f64 = 0.5;

impl Simulator {
    pub(crate) fn run_active_law(&mut self, logs: &mut Vec<LogMessage>) {
        if self.modes.mode() == FlightMode::AutoMission && !self.waypoints.is_empty() {
            self.mission_law(logs);
        } else if self.modes.mode() == FlightMode::Rtl {
            self.rtl_law(logs);
        } else if let Some(target) = self.tracked_detection() {
            self.tracking_law(&target);
        } else if self.modes.shot() != CinematicShotType::None {
            self.shot_law();
        } else {
            self.idle_law();
        }
    }

    /// Fly toward the current waypoint, decelerating on approach; advance
    /// the index on capture and loiter once the mission is exhausted.
    fn mission_law(&mut self, logs: &mut Vec<LogMessage>) {
        let Some(wp) = self.waypoints.get(self.waypoint_index).cloned() else {
            return;
        };
        let target = Coordinates {
            lat: wp.lat,
            lng: wp.lng,
        };
        let here = self.telemetry.coordinates;
        let dist = geo::distance(here, target);

        self.steer_toward(geo::bearing(here, target));
        self.telemetry.speed_h = dist.min(self.config.max_speed);
        self.telemetry.speed_v = (wp.altitude - self.telemetry.altitude) * MISSION_CLIMB_GAIN;

        if dist < CAPTURE_RADIUS_M {
            logs.push(LogMessage::new(
                LogLevel::Success,
                format!("Reached waypoint {}", self.waypoint_index + 1),
            ));
            self.waypoint_index += 1;
            if self.waypoint_index >= self.waypoints.len() {
                logs.push(LogMessage::new(
                    LogLevel::Success,
                    "Mission complete; loitering",
                ));
                self.modes.complete_mission();
            }
        }
    }

    /// Cruise back toward home at RTH altitude, then descend and disarm.
    fn rtl_law(&mut self, logs: &mut Vec<LogMessage>) {
        let here = self.telemetry.coordinates;
        let dist = geo::distance(here, self.home);

        if dist > CAPTURE_RADIUS_M {
            self.steer_toward(geo::bearing(here, self.home));
            self.telemetry.speed_h = RTL_SPEED_MPS.min(self.config.max_speed);
            // Altitude is eased directly; a stale climb rate from the
            // previous mode must not keep integrating underneath it.
            self.telemetry.speed_v = 0.0;
            self.telemetry.altitude +=
                (self.config.rth_altitude - self.telemetry.altitude) * RTL_ALT_EASE;
        } else {
            self.telemetry.speed_h = 0.0;
            if self.telemetry.altitude > LANDED_ALT_M {
                self.telemetry.speed_v = LANDING_RATE_MPS;
            } else {
                self.land_and_disarm();
                logs.push(LogMessage::new(LogLevel::Success, "RTL complete; disarmed"));
            }
        }
    }

    /// Keep the locked detection centered in frame. Proportional only:
    /// the configured integral and derivative gains are inert.
    fn tracking_law(&mut self, target: &DetectedObject) {
        let (error_x, error_y) = target.center_error();
        let p = self.config.pid.p;

        self.telemetry.yaw += error_x * (p * 5.0);
        self.telemetry.pitch = -error_y * (p * 10.0);
        self.telemetry.speed_h = self.telemetry.pitch.abs() * 0.1;
        self.telemetry.gimbal_pitch =
            clamp_gimbal(self.telemetry.gimbal_pitch + error_y * -2.0);
    }

    /// Hand-tuned constant-rate profiles, applied fresh every tick.
    fn shot_law(&mut self) {
        match self.modes.shot() {
            CinematicShotType::OrbitLeft => {
                self.telemetry.yaw -= 1.5;
                self.telemetry.speed_h = 2.0;
                self.telemetry.gimbal_pitch = -15.0;
            }
            CinematicShotType::OrbitRight => {
                self.telemetry.yaw += 1.5;
                self.telemetry.speed_h = 2.0;
                self.telemetry.gimbal_pitch = -15.0;
            }
            CinematicShotType::Dronie => {
                self.telemetry.speed_v = 1.0;
                self.telemetry.speed_h = -2.0;
                self.telemetry.gimbal_pitch = -10.0;
            }
            CinematicShotType::Helix => {
                self.telemetry.yaw += 2.0;
                self.telemetry.speed_v = 0.5;
                self.telemetry.gimbal_pitch = -30.0;
            }
            // ROCKET has no motion profile upstream; keep it a no-op
            // rather than inventing one.
            CinematicShotType::Rocket => {}
            CinematicShotType::None => {}
        }
    }

    /// Settling hover: damped pitch/roll jitter, speeds decaying to zero.
    fn idle_law(&mut self) {
        let t = self.ticks as f64;
        self.telemetry.pitch = self.telemetry.pitch * 0.9 + (t * 0.05).sin() * 0.5;
        self.telemetry.roll = (t * 0.03).sin();
        self.telemetry.speed_h *= 0.95;
        self.telemetry.speed_v *= 0.95;
    }

    /// Ease yaw toward a bearing with wraparound-safe error in (-180, 180].
    fn steer_toward(&mut self, bearing_deg: f64) {
        let mut error = bearing_deg - self.telemetry.yaw;
        if error > 180.0 {
            error -= 360.0;
        }
        if error < -180.0 {
            error += 360.0;
        }
        self.telemetry.yaw += error * YAW_EASE;
    }

    fn tracked_detection(&self) -> Option<DetectedObject> {
        let id = self.modes.tracked_object()?;
        self.objects.iter().find(|o| o.id == id).cloned()
    }
}
