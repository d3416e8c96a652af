use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::window::WindowSnapshot;

/// one decoded `sensor` payload
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// distance to the nearest obstacle in cm
    pub distance: f64,
    pub motion_detected: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("payload is missing field `{0}`")]
    MissingField(&'static str),

    #[error("distance is not a finite number: {0}")]
    InvalidDistance(String),

    #[error("motion flag is neither a boolean nor 0/1: {0}")]
    InvalidMotion(String),
}

impl Reading {
    /// decode `{dist, mov}`
    ///
    /// `mov` is accepted as a boolean or as the integers 0/1 the gate
    /// controller firmware sends.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        let dist = payload.get("dist").ok_or(PayloadError::MissingField("dist"))?;
        let distance = dist
            .as_f64()
            .filter(|d| d.is_finite())
            .ok_or_else(|| PayloadError::InvalidDistance(dist.to_string()))?;

        let mov = payload.get("mov").ok_or(PayloadError::MissingField("mov"))?;
        let motion_detected = match mov {
            Value::Bool(b) => *b,
            Value::Number(n) => match n.as_u64() {
                Some(0) => false,
                Some(1) => true,
                _ => return Err(PayloadError::InvalidMotion(mov.to_string())),
            },
            _ => return Err(PayloadError::InvalidMotion(mov.to_string())),
        };

        Ok(Self { distance, motion_detected })
    }
}

/// outbound servo position request, forwarded to the device unchanged
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoCommand {
    pub angle: f64,
}

/// the two text slots next to the chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusText {
    pub distance: String,
    pub motion: String,
}

impl StatusText {
    pub const MOTION_DETECTED: &'static str = "DETECTED";
    pub const MOTION_IDLE: &'static str = "NO";

    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            distance: format!("{} cm", reading.distance),
            motion: if reading.motion_detected {
                Self::MOTION_DETECTED
            } else {
                Self::MOTION_IDLE
            }
            .to_string(),
        }
    }
}

impl Default for StatusText {
    /// placeholder shown before the first reading
    fn default() -> Self {
        Self {
            distance: "--- cm".to_string(),
            motion: "---".to_string(),
        }
    }
}

/// how the renderer should apply a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedrawMode {
    /// no animation, one redraw per reading
    Immediate,
    Animated,
}

/// chart payload pushed to dashboard clients
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFrame {
    #[serde(flatten)]
    pub snapshot: WindowSnapshot,
    pub animation: bool,
}

impl DashboardFrame {
    pub fn new(snapshot: WindowSnapshot, mode: RedrawMode) -> Self {
        Self {
            snapshot,
            animation: mode == RedrawMode::Animated,
        }
    }
}

/// server -> browser messages, `{"event": .., "data": ..}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { msg: String },
    Frame(DashboardFrame),
    Status(StatusText),
}

/// browser -> server messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Command(ServoCommand),
}

/// everything the event loop reacts to, in delivery order
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// raw `sensor` payload from the device link
    Sensor(Value),
    /// servo request from a dashboard client
    Command(ServoCommand),
    ClientConnected,
    ClientDisconnected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_integer_motion() {
        let r = Reading::from_payload(&json!({"dist": 2510, "mov": 1})).unwrap();
        assert_eq!(r, Reading { distance: 2510.0, motion_detected: true });
    }

    #[test]
    fn test_decode_bool_motion() {
        let r = Reading::from_payload(&json!({"dist": 12.5, "mov": false})).unwrap();
        assert!(!r.motion_detected);
        assert_eq!(r.distance, 12.5);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(
            Reading::from_payload(&json!({"mov": 0})),
            Err(PayloadError::MissingField("dist"))
        );
        assert_eq!(
            Reading::from_payload(&json!({"dist": 3})),
            Err(PayloadError::MissingField("mov"))
        );
        assert!(matches!(
            Reading::from_payload(&json!({"dist": "far", "mov": 0})),
            Err(PayloadError::InvalidDistance(_))
        ));
        assert!(matches!(
            Reading::from_payload(&json!({"dist": 3, "mov": 2})),
            Err(PayloadError::InvalidMotion(_))
        ));
        assert!(Reading::from_payload(&json!(null)).is_err());
    }

    #[test]
    fn test_status_text() {
        let s = StatusText::from_reading(&Reading { distance: 2500.0, motion_detected: true });
        assert_eq!(s.distance, "2500 cm");
        assert_eq!(s.motion, "DETECTED");
        let s = StatusText::from_reading(&Reading { distance: 7.5, motion_detected: false });
        assert_eq!(s.distance, "7.5 cm");
        assert_eq!(s.motion, "NO");
    }

    #[test]
    fn test_frame_wire_format() {
        let mut snapshot = WindowSnapshot::default();
        snapshot.labels.push("12:00:00".into());
        snapshot.distances.push(20.0);
        let msg = ServerMessage::Frame(DashboardFrame::new(snapshot, RedrawMode::Immediate));
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["event"], "frame");
        assert_eq!(v["data"]["labels"][0], "12:00:00");
        assert_eq!(v["data"]["animation"], false);
    }

    #[test]
    fn test_client_command_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"command","data":{"angle":180}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Command(ServoCommand { angle: 180.0 }));
    }
}
