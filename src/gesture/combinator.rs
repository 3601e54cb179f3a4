//! Two-hand composite gestures.

use std::time::Instant;

use super::types::{Gesture, GestureLandmarks, GestureType, Handedness};

/// Synthesizes a composite gesture from this frame's LEFT and RIGHT
/// classifications. Only DOUBLE_PINCH is defined. A missing hand just means no
/// composite.
pub fn combine_hands(
    left: Option<&Gesture>,
    right: Option<&Gesture>,
    now: Instant,
) -> Option<Gesture> {
    let (left, right) = (left?, right?);

    if left.gesture_id != GestureType::Pinch || right.gesture_id != GestureType::Pinch {
        return None;
    }

    let (left_points, right_points) = (left.single_landmarks()?, right.single_landmarks()?);

    Some(Gesture {
        gesture_id: GestureType::DoublePinch,
        timestamp: now,
        handedness: Handedness::Both,
        confidence: left.confidence.min(right.confidence),
        landmarks: GestureLandmarks::Double {
            left: left_points.to_vec(),
            right: right_points.to_vec(),
        },
    })
}
