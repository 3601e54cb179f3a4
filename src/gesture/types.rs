use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, Result};

// ── Landmark layout ────────────────────────────────────────

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// A keypoint in normalized video space. `z` is relative depth and may be
/// absent in recorded data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ── Handedness ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Handedness {
    #[serde(alias = "Left", alias = "left")]
    Left,
    #[serde(alias = "Right", alias = "right")]
    Right,
    /// Synthesized two-hand gestures only.
    Both,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Both => "BOTH",
        }
    }
}

/// One hand as reported by the external landmark classifier for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandDetection {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    /// The classifier's own gesture label, e.g. `"Closed_Fist"`.
    #[serde(default)]
    pub builtin_label: Option<String>,
    pub confidence: f64,
}

// ── Gesture types ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureType {
    ClosedFist,
    ILoveYou,
    Unidentified,
    OpenPalm,
    PointingUp,
    ThumbDown,
    ThumbUp,
    Victory,
    Pinch,
    DoublePinch,
    TwoFingerPointingLeft,
    TwoFingerPointingRight,
    Draw,
}

impl GestureType {
    pub const ALL: [GestureType; 13] = [
        Self::ClosedFist,
        Self::ILoveYou,
        Self::Unidentified,
        Self::OpenPalm,
        Self::PointingUp,
        Self::ThumbDown,
        Self::ThumbUp,
        Self::Victory,
        Self::Pinch,
        Self::DoublePinch,
        Self::TwoFingerPointingLeft,
        Self::TwoFingerPointingRight,
        Self::Draw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosedFist => "CLOSED_FIST",
            Self::ILoveYou => "I_LOVE_YOU",
            Self::Unidentified => "UNIDENTIFIED",
            Self::OpenPalm => "OPEN_PALM",
            Self::PointingUp => "POINTING_UP",
            Self::ThumbDown => "THUMB_DOWN",
            Self::ThumbUp => "THUMB_UP",
            Self::Victory => "VICTORY",
            Self::Pinch => "PINCH",
            Self::DoublePinch => "DOUBLE_PINCH",
            Self::TwoFingerPointingLeft => "TWO_FINGER_POINTING_LEFT",
            Self::TwoFingerPointingRight => "TWO_FINGER_POINTING_RIGHT",
            Self::Draw => "DRAW",
        }
    }

    /// Maps the external classifier's label onto a gesture. Unknown labels
    /// and the classifier's own `"None"` become `Unidentified`.
    pub fn from_builtin_label(label: &str) -> Self {
        match label {
            "Closed_Fist" => Self::ClosedFist,
            "Open_Palm" => Self::OpenPalm,
            "Pointing_Up" => Self::PointingUp,
            "Thumb_Down" => Self::ThumbDown,
            "Thumb_Up" => Self::ThumbUp,
            "Victory" => Self::Victory,
            "ILoveYou" => Self::ILoveYou,
            _ => Self::Unidentified,
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|gesture| gesture.as_str() == value)
            .ok_or_else(|| anyhow!("unknown gesture type '{value}'"))
    }
}

// ── Gesture ────────────────────────────────────────────────

/// Landmarks carried by a classified gesture: one hand, or both hands for a
/// synthesized composite.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureLandmarks {
    Single(Vec<Landmark>),
    Double { left: Vec<Landmark>, right: Vec<Landmark> },
}

/// A per-frame classification result. Consumed by the stabilizer, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub gesture_id: GestureType,
    pub timestamp: Instant,
    pub handedness: Handedness,
    pub confidence: f64,
    pub landmarks: GestureLandmarks,
}

impl Gesture {
    pub fn single(
        gesture_id: GestureType,
        handedness: Handedness,
        confidence: f64,
        landmarks: Vec<Landmark>,
        timestamp: Instant,
    ) -> Self {
        Self {
            gesture_id,
            timestamp,
            handedness,
            confidence,
            landmarks: GestureLandmarks::Single(landmarks),
        }
    }

    pub fn single_landmarks(&self) -> Option<&[Landmark]> {
        match &self.landmarks {
            GestureLandmarks::Single(points) => Some(points),
            GestureLandmarks::Double { .. } => None,
        }
    }

    pub fn double_landmarks(&self) -> Option<(&[Landmark], &[Landmark])> {
        match &self.landmarks {
            GestureLandmarks::Double { left, right } => Some((left, right)),
            GestureLandmarks::Single(_) => None,
        }
    }

    /// Index fingertip of a single-hand gesture.
    pub fn index_tip(&self) -> Option<Landmark> {
        self.single_landmarks()
            .and_then(|points| points.get(INDEX_TIP))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_type_round_trips_through_str() {
        for gesture in GestureType::ALL {
            assert_eq!(gesture.as_str().parse::<GestureType>().unwrap(), gesture);
        }
        assert!("WAVE".parse::<GestureType>().is_err());
    }

    #[test]
    fn test_builtin_labels() {
        assert_eq!(GestureType::from_builtin_label("Closed_Fist"), GestureType::ClosedFist);
        assert_eq!(GestureType::from_builtin_label("ILoveYou"), GestureType::ILoveYou);
        assert_eq!(GestureType::from_builtin_label("None"), GestureType::Unidentified);
        assert_eq!(GestureType::from_builtin_label("Wave"), GestureType::Unidentified);
    }

    #[test]
    fn test_detection_deserializes_classifier_json() {
        let json = r#"{
            "landmarks": [{"x": 0.5, "y": 0.25}],
            "handedness": "Left",
            "builtinLabel": "Open_Palm",
            "confidence": 0.8
        }"#;
        let detection: HandDetection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.handedness, Handedness::Left);
        assert_eq!(detection.landmarks[0].z, 0.0);
        assert_eq!(detection.builtin_label.as_deref(), Some("Open_Palm"));
    }

    #[test]
    fn test_landmark_distance() {
        let a = Landmark::new(0.0, 0.0);
        let b = Landmark { x: 0.3, y: 0.4, z: 0.0 };
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
    }
}
