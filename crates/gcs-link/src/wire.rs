//! JSON frames exchanged with the vehicle bridge.
//!
//! Commands go out as `{"type": "...", "payload": {...}}`; updates come
//! back as partial objects carrying any subset of telemetry, detections,
//! logs, and connection status.

use serde::{Deserialize, Serialize};

use gcs_core::models::{
    CinematicShotType, ConfigPatch, ConnectionStatus, DetectedObject, FlightMode, LogMessage,
    Telemetry, Waypoint,
};
use gcs_core::DroneEvent;

/// Outbound command frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandFrame {
    SetConfig(ConfigPatch),
    SetArmed { armed: bool },
    SetMode { mode: FlightMode },
    SetShot { shot: CinematicShotType },
    SetTrackTarget { id: Option<u32> },
    UploadMission { waypoints: Vec<Waypoint> },
    GimbalPitch { pitch: f64 },
}

/// Inbound partial update. Unknown fields (bridge keepalive pings and the
/// like) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateFrame {
    pub telemetry: Option<Telemetry>,
    pub objects: Option<Vec<DetectedObject>>,
    pub logs: Option<Vec<LogMessage>>,
    pub status: Option<ConnectionStatus>,
}

impl UpdateFrame {
    /// Expand into the facade's tagged events, in a stable order.
    pub fn into_events(self) -> Vec<DroneEvent> {
        let mut events = Vec::new();
        if let Some(status) = self.status {
            events.push(DroneEvent::Status(status));
        }
        if let Some(telemetry) = self.telemetry {
            events.push(DroneEvent::Telemetry(telemetry));
        }
        if let Some(objects) = self.objects {
            events.push(DroneEvent::Objects(objects));
        }
        if let Some(logs) = self.logs {
            events.extend(logs.into_iter().map(DroneEvent::Log));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_frames_use_the_bridge_protocol_names() {
        let frame = CommandFrame::SetMode {
            mode: FlightMode::Rtl,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value, json!({"type": "SET_MODE", "payload": {"mode": "RTL"}}));

        let frame = CommandFrame::GimbalPitch { pitch: -45.0 };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({"type": "GIMBAL_PITCH", "payload": {"pitch": -45.0}})
        );
    }

    #[test]
    fn upload_mission_carries_waypoints() {
        let frame = CommandFrame::UploadMission {
            waypoints: vec![Waypoint {
                id: "wp-0".into(),
                lat: 37.0,
                lng: -122.0,
                altitude: 25.0,
                index: 0,
            }],
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "UPLOAD_MISSION");
        assert_eq!(value["payload"]["waypoints"][0]["altitude"], 25.0);
    }

    #[test]
    fn update_frame_parses_partial_payloads() {
        let text = json!({
            "telemetry": serde_json::to_value(Telemetry::default()).unwrap(),
            "logs": [{
                "id": "abc",
                "timestamp": 1_700_000_000_000u64,
                "level": "warn",
                "message": "Obstacle detected"
            }]
        })
        .to_string();

        let update: UpdateFrame = serde_json::from_str(&text).unwrap();
        let events = update.into_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DroneEvent::Telemetry(_)));
        assert!(matches!(events[1], DroneEvent::Log(_)));
    }

    #[test]
    fn keepalive_frames_produce_no_events() {
        let update: UpdateFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(update.into_events().is_empty());
    }
}
