//! Gesture → function resolution and the UI events handlers emit.

pub mod click;
pub mod events;
pub mod handlers;
pub mod mapping;

pub use click::{ClickAction, ClickRegion, ClickTargets, Rect};
pub use events::{UiEvent, UiEventBus};
pub use mapping::{FunctionType, GestureMapping};
