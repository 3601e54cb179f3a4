//! Frame loop and the mutable state it owns.

pub mod context;
pub mod controller;
pub mod loop_worker;
pub mod pipeline;
pub mod source;

pub use context::{FrameHands, GestureRuntimeContext, View};
pub use controller::FrameLoopController;
pub use loop_worker::{LoopConfig, RuntimeCommand};
pub use pipeline::process_frame;
pub use source::{LandmarkSource, ReplaySource};
