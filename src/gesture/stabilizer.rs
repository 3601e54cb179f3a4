//! Hold-to-activate state machine.
//!
//! One slot per handedness (LEFT, RIGHT, BOTH). A slot is either empty or
//! holding a gesture since some instant. A gesture fires once it has been held
//! for the activation threshold, after which the hold restarts, so a held
//! gesture re-fires at most once per threshold period. Streaming modes bypass
//! the threshold and fire on every frame.

use std::time::{Duration, Instant};

use log::debug;

use super::types::{Gesture, GestureType, Handedness};

pub const DEFAULT_ACTIVATION_THRESHOLD: Duration = Duration::from_millis(500);

/// What a handler receives when a held gesture fires: the frame that started
/// the hold and the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub initial: Gesture,
    pub latest: Gesture,
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Holding { initial: Gesture, since: Instant },
}

impl Slot {
    fn gesture_id(&self) -> Option<GestureType> {
        match self {
            Slot::Empty => None,
            Slot::Holding { initial, .. } => Some(initial.gesture_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureStabilizer {
    activation_threshold: Duration,
    left: Slot,
    right: Slot,
    both: Slot,
}

impl Default for GestureStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_THRESHOLD)
    }
}

impl GestureStabilizer {
    pub fn new(activation_threshold: Duration) -> Self {
        Self {
            activation_threshold,
            left: Slot::Empty,
            right: Slot::Empty,
            both: Slot::Empty,
        }
    }

    pub fn activation_threshold(&self) -> Duration {
        self.activation_threshold
    }

    pub fn set_activation_threshold(&mut self, threshold: Duration) {
        self.activation_threshold = threshold;
    }

    fn slot_mut(&mut self, hand: Handedness) -> &mut Slot {
        match hand {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
            Handedness::Both => &mut self.both,
        }
    }

    /// Gesture currently being held in a slot.
    pub fn holding(&self, hand: Handedness) -> Option<GestureType> {
        match hand {
            Handedness::Left => self.left.gesture_id(),
            Handedness::Right => self.right.gesture_id(),
            Handedness::Both => self.both.gesture_id(),
        }
    }

    /// Feeds one frame for one slot. `None` means no hand this frame and empties
    /// the slot. Returns the activation when the held gesture fires.
    pub fn observe(
        &mut self,
        hand: Handedness,
        gesture: Option<Gesture>,
        now: Instant,
        streaming: bool,
    ) -> Option<Activation> {
        let threshold = self.activation_threshold;
        let slot = self.slot_mut(hand);

        let Some(gesture) = gesture else {
            *slot = Slot::Empty;
            return None;
        };

        match slot {
            Slot::Holding { initial, since } if initial.gesture_id == gesture.gesture_id => {
                if streaming || now.saturating_duration_since(*since) >= threshold {
                    *since = now;
                    Some(Activation {
                        initial: initial.clone(),
                        latest: gesture,
                    })
                } else {
                    None
                }
            }
            _ => {
                debug!(
                    "{} slot now holding {} (was {:?})",
                    hand.as_str(),
                    gesture.gesture_id,
                    slot.gesture_id()
                );
                let activation = streaming.then(|| Activation {
                    initial: gesture.clone(),
                    latest: gesture.clone(),
                });
                *slot = Slot::Holding {
                    initial: gesture,
                    since: now,
                };
                activation
            }
        }
    }

    pub fn clear(&mut self, hand: Handedness) {
        *self.slot_mut(hand) = Slot::Empty;
    }

    pub fn reset(&mut self) {
        self.left = Slot::Empty;
        self.right = Slot::Empty;
        self.both = Slot::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::types::Landmark;

    fn gesture(id: GestureType, at: Instant) -> Gesture {
        Gesture::single(id, Handedness::Right, 0.9, vec![Landmark::default(); 21], at)
    }

    fn feed(
        stabilizer: &mut GestureStabilizer,
        id: GestureType,
        start: Instant,
        duration_ms: u64,
        step_ms: u64,
    ) -> usize {
        let mut fired = 0;
        let mut t = 0;
        while t <= duration_ms {
            let now = start + Duration::from_millis(t);
            if stabilizer
                .observe(Handedness::Right, Some(gesture(id, now)), now, false)
                .is_some()
            {
                fired += 1;
            }
            t += step_ms;
        }
        fired
    }

    #[test]
    fn test_fires_once_per_threshold_period() {
        let start = Instant::now();
        for (duration, expected) in [(0, 0), (499, 0), (500, 1), (1200, 2), (2500, 5)] {
            let mut stabilizer = GestureStabilizer::default();
            let fired = feed(&mut stabilizer, GestureType::ClosedFist, start, duration, 10);
            assert_eq!(fired, expected, "duration {duration}ms");
        }
    }

    #[test]
    fn test_switching_gesture_restarts_hold() {
        let mut stabilizer = GestureStabilizer::default();
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);

        assert!(stabilizer
            .observe(Handedness::Right, Some(gesture(GestureType::ClosedFist, at(0))), at(0), false)
            .is_none());
        assert!(stabilizer
            .observe(Handedness::Right, Some(gesture(GestureType::OpenPalm, at(400))), at(400), false)
            .is_none());
        // 500ms after the first frame but only 100ms after the switch.
        assert!(stabilizer
            .observe(Handedness::Right, Some(gesture(GestureType::OpenPalm, at(500))), at(500), false)
            .is_none());
        let activation = stabilizer
            .observe(Handedness::Right, Some(gesture(GestureType::OpenPalm, at(900))), at(900), false)
            .unwrap();
        assert_eq!(activation.initial.gesture_id, GestureType::OpenPalm);
        assert_eq!(activation.initial.timestamp, at(400));
        assert_eq!(activation.latest.timestamp, at(900));
    }

    #[test]
    fn test_missing_hand_empties_slot() {
        let mut stabilizer = GestureStabilizer::default();
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);

        stabilizer.observe(Handedness::Right, Some(gesture(GestureType::Victory, at(0))), at(0), false);
        assert_eq!(stabilizer.holding(Handedness::Right), Some(GestureType::Victory));
        stabilizer.observe(Handedness::Right, None, at(300), false);
        assert_eq!(stabilizer.holding(Handedness::Right), None);
        assert!(stabilizer
            .observe(Handedness::Right, Some(gesture(GestureType::Victory, at(600))), at(600), false)
            .is_none());
    }

    #[test]
    fn test_streaming_fires_every_frame() {
        let mut stabilizer = GestureStabilizer::default();
        let t0 = Instant::now();
        let fired = (0..5)
            .filter(|i| {
                let now = t0 + Duration::from_millis(i * 10);
                stabilizer
                    .observe(Handedness::Both, Some(gesture(GestureType::DoublePinch, now)), now, true)
                    .is_some()
            })
            .count();
        assert_eq!(fired, 5);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut stabilizer = GestureStabilizer::default();
        let now = Instant::now();
        stabilizer.observe(Handedness::Left, Some(gesture(GestureType::Pinch, now)), now, false);
        stabilizer.observe(Handedness::Right, None, now, false);
        assert_eq!(stabilizer.holding(Handedness::Left), Some(GestureType::Pinch));
        assert_eq!(stabilizer.holding(Handedness::Right), None);

        stabilizer.reset();
        assert_eq!(stabilizer.holding(Handedness::Left), None);
    }
}
