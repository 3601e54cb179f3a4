//! Gesture recognition: landmark types, geometric classification,
//! hold-to-activate stabilisation, two-hand combination and screen projection.

pub mod classifier;
pub mod combinator;
pub mod projector;
pub mod stabilizer;
pub mod types;

pub use classifier::{classify_hand, ClassifierConfig};
pub use combinator::combine_hands;
pub use projector::{project, PointF, ScreenPoint, Viewport};
pub use stabilizer::{Activation, GestureStabilizer};
pub use types::{
    Gesture, GestureLandmarks, GestureType, HandDetection, Handedness, Landmark, LANDMARK_COUNT,
};
