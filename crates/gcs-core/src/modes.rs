//! Flight-mode state machine.
//!
//! Transitions happen only through explicit commands, plus two
//! loop-internal ones driven by the control laws: AUTO_MISSION -> LOITER
//! on mission completion and RTL -> disarm on landing.

use crate::models::{CinematicShotType, FlightMode, LogLevel, LogMessage};

impl FlightMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FlightMode::Manual => "MANUAL",
            FlightMode::Stabilize => "STABILIZE",
            FlightMode::AltHold => "ALT_HOLD",
            FlightMode::Loiter => "LOITER",
            FlightMode::Rtl => "RTL",
            FlightMode::FollowMe => "FOLLOW_ME",
            FlightMode::Orbit => "ORBIT",
            FlightMode::AutoMission => "AUTO_MISSION",
            FlightMode::Cinema => "CINEMA",
        }
    }
}

impl CinematicShotType {
    pub fn as_str(self) -> &'static str {
        match self {
            CinematicShotType::None => "NONE",
            CinematicShotType::OrbitLeft => "ORBIT_LEFT",
            CinematicShotType::OrbitRight => "ORBIT_RIGHT",
            CinematicShotType::Dronie => "DRONIE",
            CinematicShotType::Helix => "HELIX",
            CinematicShotType::Rocket => "ROCKET",
        }
    }
}

/// Mode, active cinematic shot, and tracking target, with the entry/exit
/// side effects the transitions own.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: FlightMode,
    shot: CinematicShotType,
    tracked_object: Option<u32>,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self {
            mode: FlightMode::Manual,
            shot: CinematicShotType::None,
            tracked_object: None,
        }
    }
}

impl ModeMachine {
    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    pub fn shot(&self) -> CinematicShotType {
        self.shot
    }

    pub fn tracked_object(&self) -> Option<u32> {
        self.tracked_object
    }

    /// Request a mode change. Entering AUTO_MISSION without an uploaded
    /// mission is rejected: the vehicle loiters instead and a warning
    /// signal is returned.
    pub fn set_mode(&mut self, target: FlightMode, mission_len: usize) -> Vec<LogMessage> {
        let mut logs = Vec::new();

        self.mode = if target == FlightMode::AutoMission {
            if mission_len == 0 {
                logs.push(LogMessage::new(
                    LogLevel::Warn,
                    "No mission uploaded; loitering instead",
                ));
                FlightMode::Loiter
            } else {
                logs.push(LogMessage::new(
                    LogLevel::Info,
                    format!("Starting mission: {mission_len} waypoints"),
                ));
                FlightMode::AutoMission
            }
        } else {
            target
        };

        self.apply_exit_effects();
        logs
    }

    /// Select a cinematic shot; this is itself a transition into CINEMA.
    pub fn select_shot(&mut self, shot: CinematicShotType) -> Vec<LogMessage> {
        self.shot = shot;
        self.mode = FlightMode::Cinema;
        vec![LogMessage::new(
            LogLevel::Info,
            format!("Starting cinematic shot: {}", shot.as_str()),
        )]
    }

    /// Lock or release the tracking target. Locking transitions into
    /// FOLLOW_ME; releasing only clears the id — any fallback mode is the
    /// caller's decision and is accepted like any other mode change.
    pub fn set_tracked_object(&mut self, id: Option<u32>) -> Vec<LogMessage> {
        self.tracked_object = id;
        match id {
            Some(id) => {
                self.mode = FlightMode::FollowMe;
                vec![LogMessage::new(
                    LogLevel::Success,
                    format!("Target locked: tracking object {id}"),
                )]
            }
            None => vec![LogMessage::new(LogLevel::Info, "Target released")],
        }
    }

    /// Arming overrides whatever mode was active.
    pub fn arm(&mut self) {
        self.mode = FlightMode::Stabilize;
        self.shot = CinematicShotType::None;
        self.tracked_object = None;
    }

    pub fn disarm(&mut self) {
        self.mode = FlightMode::Manual;
        self.shot = CinematicShotType::None;
        self.tracked_object = None;
    }

    /// Loop-internal transition once the last waypoint is reached.
    pub fn complete_mission(&mut self) {
        self.mode = FlightMode::Loiter;
        self.apply_exit_effects();
    }

    fn apply_exit_effects(&mut self) {
        if self.mode != FlightMode::Cinema {
            self.shot = CinematicShotType::None;
        }
        if self.mode != FlightMode::FollowMe {
            self.tracked_object = None;
        }
    }
}
