//! Tick-driven vehicle simulator.
//!
//! One `Simulator` instance owns the live telemetry record. Commands are
//! applied synchronously between ticks; `tick()` runs the fixed-rate
//! physics/control pipeline and hands back the snapshot to emit.

use std::time::Duration;

use rand::Rng;

use crate::geo;
use crate::models::{
    CinematicShotType, ConfigPatch, Coordinates, DetectedObject, DroneConfig, FlightMode, LogLevel,
    LogMessage, Telemetry, Waypoint,
};
use crate::modes::ModeMachine;

/// Nominal tick interval. A tunable constant, not a contract.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Seconds of simulated time per tick.
pub(crate) const TICK_SECS: f64 = 0.05;

/// Degrees of lat/lng per m/s of horizontal speed per tick. A flat planar
/// scale; meters-per-degree variation with latitude is ignored at the
/// distances simulated here.
pub(crate) const POSITION_SCALE: f64 = 1e-5;

/// Altitude integration step per tick, seconds-equivalent.
pub(crate) const ALT_STEP: f64 = 0.05;

/// Battery level at arming; drains ~1% per flight minute.
const BATTERY_FULL: f64 = 98.0;

/// Hover altitude right after arming.
const TAKEOFF_HOVER_ALT_M: f64 = 1.5;

const GIMBAL_MIN_DEG: f64 = -90.0;
const GIMBAL_MAX_DEG: f64 = 20.0;

const OBSTACLE_SAFE_M: f64 = 10.0;
const OBSTACLE_BRAKE_FACTOR: f64 = 0.1;

pub(crate) fn clamp_gimbal(degrees: f64) -> f64 {
    degrees.clamp(GIMBAL_MIN_DEG, GIMBAL_MAX_DEG)
}

/// Result of one tick: the snapshot plus any signals the laws raised.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub telemetry: Telemetry,
    pub objects: Vec<DetectedObject>,
    pub logs: Vec<LogMessage>,
}

/// The simulated vehicle. Single-threaded by design; the owning task
/// interleaves commands and ticks.
#[derive(Debug)]
pub struct Simulator {
    pub(crate) config: DroneConfig,
    pub(crate) telemetry: Telemetry,
    pub(crate) home: Coordinates,
    pub(crate) armed: bool,
    pub(crate) modes: ModeMachine,
    pub(crate) waypoints: Vec<Waypoint>,
    pub(crate) waypoint_index: usize,
    pub(crate) objects: Vec<DetectedObject>,
    pub(crate) ticks: u64,
    flight_ticks: u64,
}

impl Simulator {
    pub fn new(config: DroneConfig) -> Self {
        let telemetry = Telemetry::default();
        let home = telemetry.coordinates;
        Self {
            config,
            telemetry,
            home,
            armed: false,
            modes: ModeMachine::default(),
            waypoints: Vec::new(),
            waypoint_index: 0,
            objects: Vec::new(),
            ticks: 0,
            flight_ticks: 0,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn config(&self) -> &DroneConfig {
        &self.config
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    pub fn mode(&self) -> FlightMode {
        self.modes.mode()
    }

    pub fn shot(&self) -> CinematicShotType {
        self.modes.shot()
    }

    pub fn tracked_object(&self) -> Option<u32> {
        self.modes.tracked_object()
    }

    // ---- Commands -------------------------------------------------------

    pub fn set_armed(&mut self, armed: bool) -> Vec<LogMessage> {
        self.armed = armed;
        if armed {
            self.flight_ticks = 0;
            self.telemetry.flight_time = 0;
            self.telemetry.altitude = TAKEOFF_HOVER_ALT_M;
            self.telemetry.gimbal_pitch = 0.0;
            // Home is wherever the vehicle sits at the moment of arming.
            self.home = self.telemetry.coordinates;
            self.telemetry.distance_home = 0.0;
            self.modes.arm();
            vec![LogMessage::new(LogLevel::Info, "Armed; holding position")]
        } else {
            self.land_and_disarm();
            vec![LogMessage::new(LogLevel::Info, "Disarmed")]
        }
    }

    pub fn set_flight_mode(&mut self, mode: FlightMode) -> Vec<LogMessage> {
        self.modes.set_mode(mode, self.waypoints.len())
    }

    pub fn set_cinematic_shot(&mut self, shot: CinematicShotType) -> Vec<LogMessage> {
        self.modes.select_shot(shot)
    }

    pub fn set_tracked_object(&mut self, id: Option<u32>) -> Vec<LogMessage> {
        self.modes.set_tracked_object(id)
    }

    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) -> Vec<LogMessage> {
        self.waypoints = waypoints;
        self.waypoint_index = 0;
        vec![LogMessage::new(
            LogLevel::Info,
            format!("Mission uploaded: {} waypoints", self.waypoints.len()),
        )]
    }

    pub fn set_gimbal_pitch(&mut self, degrees: f64) {
        self.telemetry.gimbal_pitch = clamp_gimbal(degrees);
    }

    pub fn update_config(&mut self, patch: ConfigPatch) -> Vec<LogMessage> {
        self.config.apply(patch);
        vec![LogMessage::new(LogLevel::Info, "Configuration updated")]
    }

    // ---- Tick pipeline --------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickOutput {
        self.ticks += 1;
        let time = self.ticks as f64 * TICK_SECS;
        let mut logs = Vec::new();

        // The vision pipeline runs whether or not we fly.
        self.refresh_objects(time);

        if self.armed {
            self.flight_ticks += 1;
            self.telemetry.flight_time = (self.flight_ticks as f64 * TICK_SECS) as u64;
            let minutes = self.telemetry.flight_time as f64 / 60.0;
            self.telemetry.battery = (BATTERY_FULL - minutes).clamp(0.0, 100.0);
            self.telemetry.distance_home = geo::distance(self.telemetry.coordinates, self.home);

            self.run_active_law(&mut logs);

            self.telemetry.yaw = self.telemetry.yaw.rem_euclid(360.0);
            self.integrate_position();
            self.clamp_altitude();
            self.sense_obstacles(time, &mut logs);
        }

        TickOutput {
            telemetry: self.telemetry.clone(),
            objects: self.objects.clone(),
            logs,
        }
    }

    /// Synthetic stand-in for the detector: one slowly weaving person.
    fn refresh_objects(&mut self, time: f64) {
        let x = 0.5 + (time * 0.5).sin() * 0.3;
        let y = 0.5 + (time * 0.25).sin() * 0.15;
        self.objects = vec![DetectedObject {
            id: 1,
            label: "person".to_string(),
            confidence: 0.92,
            bbox: [x, y, 0.1, 0.2],
            tracking: self.modes.tracked_object() == Some(1),
        }];
    }

    fn integrate_position(&mut self) {
        let heading = self.telemetry.yaw.to_radians();
        self.telemetry.coordinates.lat += self.telemetry.speed_h * heading.cos() * POSITION_SCALE;
        self.telemetry.coordinates.lng += self.telemetry.speed_h * heading.sin() * POSITION_SCALE;
        self.telemetry.altitude += self.telemetry.speed_v * ALT_STEP;
    }

    fn clamp_altitude(&mut self) {
        if self.telemetry.altitude > self.config.max_altitude {
            self.telemetry.altitude = self.config.max_altitude;
            self.telemetry.speed_v = 0.0;
        }
        if self.telemetry.altitude < 0.0 {
            self.telemetry.altitude = 0.0;
        }
    }

    /// Time-based oscillator standing in for a forward depth sensor. The
    /// "near obstacle" phase covers a fraction of each cycle; in manual
    /// mode, or with avoidance disabled, it only affects the reading.
    fn sense_obstacles(&mut self, time: f64, logs: &mut Vec<LogMessage>) {
        if (time * 0.2).sin() > 0.8 {
            self.telemetry.obstacle_distance = 1.5 + rand::rng().random_range(0.0..0.5);
            if self.modes.mode() != FlightMode::Manual && self.config.obstacle_avoidance_enabled {
                self.telemetry.speed_h *= OBSTACLE_BRAKE_FACTOR;
                logs.push(LogMessage::new(LogLevel::Warn, "Obstacle detected; braking"));
            }
        } else {
            self.telemetry.obstacle_distance = OBSTACLE_SAFE_M;
        }
    }

    /// Zero motion and disarm. Used by the disarm command and by the RTL
    /// law once the vehicle has touched down.
    pub(crate) fn land_and_disarm(&mut self) {
        self.armed = false;
        self.telemetry.altitude = 0.0;
        self.telemetry.speed_h = 0.0;
        self.telemetry.speed_v = 0.0;
        self.modes.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_sim() -> Simulator {
        let mut sim = Simulator::new(DroneConfig::default());
        sim.set_armed(true);
        sim
    }

    fn waypoint(id: &str, lat: f64, lng: f64, altitude: f64, index: u32) -> Waypoint {
        Waypoint {
            id: id.to_string(),
            lat,
            lng,
            altitude,
            index,
        }
    }

    #[test]
    fn altitude_and_yaw_stay_in_bounds() {
        let mut sim = armed_sim();
        sim.update_config(ConfigPatch {
            max_altitude: Some(10.0),
            ..Default::default()
        });
        // HELIX climbs and spins continuously.
        sim.set_cinematic_shot(CinematicShotType::Helix);

        for _ in 0..2_000 {
            let out = sim.tick();
            assert!(out.telemetry.altitude >= 0.0);
            assert!(out.telemetry.altitude <= 10.0);
            assert!(out.telemetry.yaw >= 0.0 && out.telemetry.yaw < 360.0);
        }

        // Ceiling hit zeroes the climb rate.
        assert_eq!(sim.telemetry().altitude, 10.0);
        assert_eq!(sim.telemetry().speed_v, 0.0);
    }

    #[test]
    fn battery_is_monotone_while_armed_and_survives_disarm() {
        let mut sim = armed_sim();
        let mut previous = sim.telemetry().battery;
        for _ in 0..2_500 {
            let out = sim.tick();
            assert!(out.telemetry.battery <= previous);
            assert!(out.telemetry.battery >= 0.0 && out.telemetry.battery <= 100.0);
            previous = out.telemetry.battery;
        }

        sim.set_armed(false);
        for _ in 0..100 {
            sim.tick();
        }
        assert_eq!(sim.telemetry().battery, previous);
    }

    #[test]
    fn disarming_zeroes_motion_and_clears_shot_and_target() {
        let mut sim = armed_sim();
        sim.set_cinematic_shot(CinematicShotType::Dronie);
        for _ in 0..20 {
            sim.tick();
        }
        assert!(sim.telemetry().speed_h != 0.0 || sim.telemetry().speed_v != 0.0);

        sim.set_armed(false);
        assert_eq!(sim.telemetry().speed_h, 0.0);
        assert_eq!(sim.telemetry().speed_v, 0.0);
        assert_eq!(sim.shot(), CinematicShotType::None);
        assert_eq!(sim.tracked_object(), None);
        assert_eq!(sim.mode(), FlightMode::Manual);
    }

    #[test]
    fn arming_captures_home_and_resets_flight_time() {
        let mut sim = armed_sim();
        for _ in 0..100 {
            sim.tick();
        }
        sim.telemetry.coordinates.lat += 0.001;
        sim.set_armed(false);
        sim.set_armed(true);

        assert_eq!(sim.telemetry().flight_time, 0);
        assert_eq!(sim.home, sim.telemetry().coordinates);
        assert_eq!(sim.telemetry().distance_home, 0.0);
        assert_eq!(sim.mode(), FlightMode::Stabilize);
    }

    #[test]
    fn mission_scenario_reaches_both_waypoints_then_loiters() {
        let mut sim = armed_sim();
        sim.set_waypoints(vec![
            waypoint("wp-0", 37.7760, -122.4194, 20.0, 0),
            waypoint("wp-1", 37.7760, -122.4205, 20.0, 1),
        ]);
        sim.set_flight_mode(FlightMode::AutoMission);
        assert_eq!(sim.mode(), FlightMode::AutoMission);

        let mut messages = Vec::new();
        let mut distance_home_at_completion = None;
        for _ in 0..5_000 {
            let out = sim.tick();
            for log in &out.logs {
                messages.push(log.message.clone());
            }
            if messages.iter().any(|m| m.contains("Mission complete")) {
                distance_home_at_completion = Some(out.telemetry.distance_home);
                break;
            }
        }

        let distance_home = distance_home_at_completion.expect("mission never completed");
        assert!(messages.iter().any(|m| m.contains("waypoint 1")));
        assert!(messages.iter().any(|m| m.contains("waypoint 2")));
        assert_eq!(sim.mode(), FlightMode::Loiter);

        // The vehicle should sit near the last waypoint when it finishes.
        let expected = crate::geo::distance(
            sim.home,
            Coordinates {
                lat: 37.7760,
                lng: -122.4205,
            },
        );
        assert!(
            (distance_home - expected).abs() < 15.0,
            "distance home {distance_home} vs expected {expected}"
        );
    }

    #[test]
    fn empty_mission_start_degrades_to_loiter() {
        let mut sim = armed_sim();
        let logs = sim.set_flight_mode(FlightMode::AutoMission);

        assert_eq!(sim.mode(), FlightMode::Loiter);
        assert_eq!(logs[0].level, LogLevel::Warn);
    }

    #[test]
    fn rtl_from_hover_lands_and_disarms() {
        let mut sim = armed_sim();
        sim.set_flight_mode(FlightMode::Rtl);

        let mut completed = false;
        for _ in 0..200 {
            let out = sim.tick();
            if out.logs.iter().any(|l| l.message.contains("RTL complete")) {
                completed = true;
                break;
            }
        }

        assert!(completed);
        assert!(!sim.armed());
        assert_eq!(sim.telemetry().speed_h, 0.0);
        assert!(sim.telemetry().altitude <= 0.5);
        assert_eq!(sim.mode(), FlightMode::Manual);
    }

    #[test]
    fn rtl_from_offset_returns_home_before_landing() {
        let mut sim = armed_sim();
        // ~10m north of home, already facing it.
        sim.telemetry.coordinates.lat += 9e-5;
        sim.telemetry.yaw = 180.0;
        sim.set_flight_mode(FlightMode::Rtl);

        let mut disarm_tick = None;
        for tick in 0..2_000 {
            let out = sim.tick();
            if out.logs.iter().any(|l| l.message.contains("RTL complete")) {
                disarm_tick = Some(tick);
                break;
            }
        }

        assert!(disarm_tick.is_some(), "RTL never completed");
        assert!(!sim.armed());
        assert!(sim.telemetry().distance_home < 5.0);
    }

    #[test]
    fn obstacle_phase_brakes_autonomous_flight() {
        let mut sim = armed_sim();
        // ORBIT_RIGHT re-asserts speed_h = 2.0 every tick, so braking is
        // visible within the same tick it happens.
        sim.set_cinematic_shot(CinematicShotType::OrbitRight);

        let mut braked = false;
        for _ in 0..400 {
            let out = sim.tick();
            if out.telemetry.obstacle_distance < 2.5 {
                assert!(out.telemetry.speed_h < 2.0 * 0.11);
                assert!(out.logs.iter().any(|l| l.level == LogLevel::Warn));
                braked = true;
            }
        }
        assert!(braked, "obstacle phase never engaged");
    }

    #[test]
    fn obstacle_phase_only_reads_sensor_when_avoidance_disabled() {
        let mut sim = armed_sim();
        sim.update_config(ConfigPatch {
            obstacle_avoidance_enabled: Some(false),
            ..Default::default()
        });
        sim.set_cinematic_shot(CinematicShotType::OrbitRight);

        let mut near_seen = false;
        for _ in 0..400 {
            let out = sim.tick();
            if out.telemetry.obstacle_distance < 2.5 {
                near_seen = true;
                assert_eq!(out.telemetry.speed_h, 2.0);
                assert!(out.logs.is_empty());
            }
        }
        assert!(near_seen);
    }

    #[test]
    fn gimbal_commands_clamp_to_bounds() {
        let mut sim = armed_sim();
        sim.set_gimbal_pitch(45.0);
        assert_eq!(sim.telemetry().gimbal_pitch, 20.0);
        sim.set_gimbal_pitch(-120.0);
        assert_eq!(sim.telemetry().gimbal_pitch, -90.0);
        sim.set_gimbal_pitch(-15.0);
        assert_eq!(sim.telemetry().gimbal_pitch, -15.0);
    }

    #[test]
    fn tracking_law_steers_toward_the_target() {
        let mut sim = armed_sim();
        sim.set_tracked_object(Some(1));
        assert_eq!(sim.mode(), FlightMode::FollowMe);

        // Stay clear of the obstacle oscillator's first "near" phase so
        // the braking attenuation cannot mask the law's speed output.
        let mut pitch_moved = false;
        for _ in 0..80 {
            let out = sim.tick();
            assert!(out.telemetry.gimbal_pitch >= -90.0 && out.telemetry.gimbal_pitch <= 20.0);
            if out.telemetry.pitch.abs() > 1e-6 {
                pitch_moved = true;
                // The vehicle creeps forward proportionally to its tilt.
                assert!((out.telemetry.speed_h - out.telemetry.pitch.abs() * 0.1).abs() < 1e-9);
            }
            assert!(out.objects[0].tracking);
        }
        assert!(pitch_moved);
    }

    #[test]
    fn rocket_shot_is_an_explicit_no_op() {
        let mut sim = armed_sim();
        sim.set_cinematic_shot(CinematicShotType::Rocket);
        assert_eq!(sim.mode(), FlightMode::Cinema);

        let before = sim.telemetry().clone();
        let out = sim.tick();
        // No motion profile: speeds untouched by the law (only hover-state
        // values from arming, which are zero).
        assert_eq!(out.telemetry.speed_h, before.speed_h);
        assert_eq!(out.telemetry.speed_v, before.speed_v);
        assert_eq!(out.telemetry.gimbal_pitch, before.gimbal_pitch);
    }

    #[test]
    fn vision_objects_update_even_while_disarmed() {
        let mut sim = Simulator::new(DroneConfig::default());
        let first = sim.tick();
        let second = sim.tick();
        assert_eq!(first.objects.len(), 1);
        assert_ne!(first.objects[0].bbox, second.objects[0].bbox);
        assert_eq!(second.telemetry.flight_time, 0);
    }
}
