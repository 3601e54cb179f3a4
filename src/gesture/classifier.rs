//! Geometric gesture classification over a single hand's 21 landmarks.
//!
//! Detects POINTING_UP, TWO_FINGER_POINTING_{LEFT,RIGHT}, PINCH and DRAW from
//! Euclidean distances between named landmarks. A match overrides the external
//! classifier's label; no match falls back to it. DOUBLE_PINCH is never produced
//! here, see [`super::combinator`].

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PipelineError;

use super::types::{
    Gesture, GestureType, HandDetection, Handedness, Landmark, INDEX_PIP, INDEX_TIP,
    LANDMARK_COUNT, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP,
    THUMB_TIP, WRIST,
};

/// Confidence reported for every geometric match. Marginal and clear matches
/// are not distinguished.
pub const CUSTOM_CONFIDENCE: f64 = 1.0;

/// Distance thresholds in normalized landmark units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    /// How much further than its PIP joint a fingertip must be from the wrist
    /// to count as extended.
    pub extension_margin: f64,
    pub pinch_thumb_index_max: f64,
    pub pinch_thumb_middle_min: f64,
    pub draw_thumb_index_max: f64,
    pub draw_thumb_middle_max: f64,
    pub draw_index_middle_max: f64,
    pub draw_index_ring_min_gap: f64,
    /// Widening factor applied to the draw thresholds while draw mode is active.
    pub draw_hysteresis: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            extension_margin: 0.04,
            pinch_thumb_index_max: 0.03,
            pinch_thumb_middle_min: 0.045,
            draw_thumb_index_max: 0.03,
            draw_thumb_middle_max: 0.035,
            draw_index_middle_max: 0.025,
            draw_index_ring_min_gap: 0.05,
            draw_hysteresis: 1.2,
        }
    }
}

/// A geometric classification result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomMatch {
    pub gesture_id: GestureType,
    pub confidence: f64,
}

impl CustomMatch {
    fn of(gesture_id: GestureType) -> Self {
        Self {
            gesture_id,
            confidence: CUSTOM_CONFIDENCE,
        }
    }
}

/// The first 21 landmarks, or `InsufficientLandmarks`. Extra points are ignored.
pub fn hand_points(landmarks: &[Landmark]) -> Result<&[Landmark; LANDMARK_COUNT], PipelineError> {
    landmarks
        .get(..LANDMARK_COUNT)
        .and_then(|points| points.try_into().ok())
        .ok_or(PipelineError::InsufficientLandmarks {
            found: landmarks.len(),
        })
}

fn dist(points: &[Landmark; LANDMARK_COUNT], a: usize, b: usize) -> f64 {
    points[a].distance(&points[b])
}

fn is_curled(points: &[Landmark; LANDMARK_COUNT], tip: usize, pip: usize) -> bool {
    dist(points, tip, WRIST) < dist(points, pip, WRIST)
}

fn is_extended(points: &[Landmark; LANDMARK_COUNT], tip: usize, pip: usize, margin: f64) -> bool {
    dist(points, tip, WRIST) > dist(points, pip, WRIST) + margin
}

pub fn detect_pointing(landmarks: &[Landmark], config: &ClassifierConfig) -> Option<CustomMatch> {
    let p = hand_points(landmarks).ok()?;

    let matched = is_extended(p, INDEX_TIP, INDEX_PIP, config.extension_margin)
        && is_curled(p, MIDDLE_TIP, MIDDLE_PIP)
        && is_curled(p, RING_TIP, RING_PIP)
        && is_curled(p, PINKY_TIP, PINKY_PIP)
        && is_curled(p, THUMB_TIP, THUMB_IP);

    matched.then(|| CustomMatch::of(GestureType::PointingUp))
}

pub fn detect_two_finger_pointing(
    landmarks: &[Landmark],
    handedness: Handedness,
    config: &ClassifierConfig,
) -> Option<CustomMatch> {
    let p = hand_points(landmarks).ok()?;

    let gesture_id = match handedness {
        Handedness::Left => GestureType::TwoFingerPointingLeft,
        Handedness::Right => GestureType::TwoFingerPointingRight,
        Handedness::Both => return None,
    };

    let matched = is_extended(p, INDEX_TIP, INDEX_PIP, config.extension_margin)
        && is_extended(p, MIDDLE_TIP, MIDDLE_PIP, config.extension_margin)
        && is_curled(p, RING_TIP, RING_PIP)
        && is_curled(p, PINKY_TIP, PINKY_PIP)
        && is_extended(p, THUMB_TIP, THUMB_IP, 0.0);

    matched.then(|| CustomMatch::of(gesture_id))
}

/// Thumb and index touching while the middle finger stays away and relaxed.
/// The middle-finger checks are what separate a pinch from a closed fist.
pub fn detect_pinch(landmarks: &[Landmark], config: &ClassifierConfig) -> Option<CustomMatch> {
    let p = hand_points(landmarks).ok()?;

    let matched = dist(p, THUMB_TIP, INDEX_TIP) < config.pinch_thumb_index_max
        && dist(p, THUMB_TIP, MIDDLE_TIP) > config.pinch_thumb_middle_min
        && !is_curled(p, MIDDLE_TIP, MIDDLE_PIP);

    matched.then(|| CustomMatch::of(GestureType::Pinch))
}

/// Thumb, index and middle tips bunched together with ring and pinky curled.
/// Thresholds widen while draw mode is active so the pose does not flicker at
/// the boundary.
pub fn detect_draw(
    landmarks: &[Landmark],
    draw_active: bool,
    config: &ClassifierConfig,
) -> Option<CustomMatch> {
    let p = hand_points(landmarks).ok()?;
    let widen = if draw_active {
        config.draw_hysteresis
    } else {
        1.0
    };

    let matched = dist(p, THUMB_TIP, INDEX_TIP) < config.draw_thumb_index_max * widen
        && dist(p, THUMB_TIP, MIDDLE_TIP) < config.draw_thumb_middle_max * widen
        && dist(p, INDEX_TIP, MIDDLE_TIP) < config.draw_index_middle_max * widen
        && dist(p, INDEX_TIP, RING_TIP) > config.draw_index_ring_min_gap / widen
        && is_curled(p, RING_TIP, RING_PIP)
        && is_curled(p, PINKY_TIP, PINKY_PIP);

    matched.then(|| CustomMatch::of(GestureType::Draw))
}

/// Runs every detector in priority order: DRAW, PINCH, TWO_FINGER_POINTING,
/// POINTING. First match wins.
pub fn classify_custom(
    landmarks: &[Landmark],
    handedness: Handedness,
    draw_active: bool,
    config: &ClassifierConfig,
) -> Option<CustomMatch> {
    detect_draw(landmarks, draw_active, config)
        .or_else(|| detect_pinch(landmarks, config))
        .or_else(|| detect_two_finger_pointing(landmarks, handedness, config))
        .or_else(|| detect_pointing(landmarks, config))
}

/// Classifies one detection, preferring a geometric match over the external
/// classifier's label.
pub fn classify_hand(
    detection: &HandDetection,
    draw_active: bool,
    config: &ClassifierConfig,
    now: Instant,
) -> Gesture {
    let (gesture_id, confidence) = match classify_custom(
        &detection.landmarks,
        detection.handedness,
        draw_active,
        config,
    ) {
        Some(custom) => (custom.gesture_id, custom.confidence),
        None => (
            detection
                .builtin_label
                .as_deref()
                .map(GestureType::from_builtin_label)
                .unwrap_or(GestureType::Unidentified),
            detection.confidence,
        ),
    };

    Gesture::single(
        gesture_id,
        detection.handedness,
        confidence,
        detection.landmarks.clone(),
        now,
    )
}

// ── Test helpers ───────────────────────────────────────────

/// A loosely closed hand: every fingertip nearer the wrist than its PIP joint.
#[cfg(test)]
pub(crate) fn relaxed_fist() -> Vec<Landmark> {
    let coords: [(f64, f64); LANDMARK_COUNT] = [
        (0.50, 0.90), // wrist
        (0.45, 0.85),
        (0.42, 0.80),
        (0.40, 0.76), // thumb ip
        (0.44, 0.78), // thumb tip
        (0.46, 0.70),
        (0.46, 0.62), // index pip
        (0.47, 0.66),
        (0.47, 0.70), // index tip
        (0.50, 0.69),
        (0.50, 0.61), // middle pip
        (0.50, 0.65),
        (0.50, 0.69), // middle tip
        (0.54, 0.70),
        (0.54, 0.63), // ring pip
        (0.54, 0.67),
        (0.54, 0.70), // ring tip
        (0.58, 0.72),
        (0.58, 0.66), // pinky pip
        (0.58, 0.69),
        (0.58, 0.72), // pinky tip
    ];
    coords.iter().map(|&(x, y)| Landmark::new(x, y)).collect()
}

#[cfg(test)]
pub(crate) fn with_points(mut hand: Vec<Landmark>, moves: &[(usize, f64, f64)]) -> Vec<Landmark> {
    for &(index, x, y) in moves {
        hand[index] = Landmark::new(x, y);
    }
    hand
}

#[cfg(test)]
pub(crate) fn pointing_hand() -> Vec<Landmark> {
    with_points(relaxed_fist(), &[(INDEX_TIP, 0.46, 0.45)])
}

#[cfg(test)]
pub(crate) fn two_finger_hand() -> Vec<Landmark> {
    with_points(
        relaxed_fist(),
        &[
            (INDEX_TIP, 0.46, 0.45),
            (MIDDLE_TIP, 0.50, 0.44),
            (THUMB_TIP, 0.32, 0.72),
        ],
    )
}

#[cfg(test)]
pub(crate) fn pinch_hand() -> Vec<Landmark> {
    with_points(
        relaxed_fist(),
        &[
            (THUMB_TIP, 0.40, 0.62),
            (INDEX_TIP, 0.41, 0.62),
            (MIDDLE_TIP, 0.50, 0.44),
        ],
    )
}

#[cfg(test)]
pub(crate) fn draw_hand() -> Vec<Landmark> {
    with_points(
        relaxed_fist(),
        &[
            (THUMB_TIP, 0.48, 0.60),
            (INDEX_TIP, 0.49, 0.60),
            (MIDDLE_TIP, 0.495, 0.61),
        ],
    )
}
