//! Stateful interaction modes that take over frame handling while active.

pub mod draw;
pub mod overlay;
pub mod zoom;

pub use draw::{DrawConfig, DrawMode, DrawPhase};
pub use overlay::{DrawCanvas, OverlayKind, OverlayRegistry};
pub use zoom::{ZoomConfig, ZoomMode};
