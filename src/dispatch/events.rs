//! Typed UI events and the bus that fans them out to the rendering layer.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What the rendering layer receives. Delivery is fire-and-forget; consumers
/// tolerate duplicates and reordering within a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    /// Select (highlight) the chart element under the point.
    Select { x: i32, y: i32 },
    /// Apply the current selection as a subset filter.
    Filter,
    /// Reset filters and selection.
    Clear,
    /// Enter or leave zoom mode around the focal point.
    ZoomToggle { x: i32, y: i32 },
    ZoomScale {
        #[serde(rename = "scaleX")]
        scale_x: f64,
        #[serde(rename = "scaleY")]
        scale_y: f64,
    },
    SwitchChart,
    SwitchData,
    DrawToggle { x: i32, y: i32 },
    /// Synthesized pointer click on a whitelisted element.
    Click { x: i32, y: i32, target: String },
    Undo,
}

/// Fans each event out to every live subscriber.
#[derive(Clone, Default)]
pub struct UiEventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<UiEvent>>>>,
}

impl UiEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UiEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: UiEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<UiEvent>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
