//! Freehand annotation over the presenting view.
//!
//! ```text
//! OFF ──toggle──▶ ARMED ──startup delay──▶ DRAWING ◀──fist / release──▶ ERASING
//!  ▲                                          │
//!  └───── toggle, open palm held, view change ┘
//! ```
//!
//! While drawing, the index fingertip is smoothed with an exponential moving
//! average and joined segment by segment. Raw movements shorter than the
//! minimum segment distance are skipped. Pose changes are debounced so a
//! single noisy frame does not break a stroke.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::overlay::{DrawCanvas, EraserIndicator, OverlayGuard, OverlayKind, OverlayRegistry};
use crate::dispatch::UiEvent;
use crate::gesture::{project, Gesture, GestureType, PointF, ScreenPoint, Viewport};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawConfig {
    pub startup_delay_ms: u64,
    pub gesture_switch_debounce_ms: u64,
    pub cancel_hold_ms: u64,
    pub smoothing_alpha: f64,
    pub min_segment_distance_px: f64,
    pub eraser_radius_px: f64,
    pub stroke_width_px: f64,
    pub stroke_color: [u8; 4],
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 500,
            gesture_switch_debounce_ms: 500,
            cancel_hold_ms: 1000,
            smoothing_alpha: 0.25,
            min_segment_distance_px: 2.0,
            eraser_radius_px: 80.0,
            stroke_width_px: 4.0,
            stroke_color: [255, 59, 48, 255],
        }
    }
}

impl DrawConfig {
    fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    fn switch_debounce(&self) -> Duration {
        Duration::from_millis(self.gesture_switch_debounce_ms)
    }

    fn cancel_hold(&self) -> Duration {
        Duration::from_millis(self.cancel_hold_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Off,
    Armed,
    Drawing,
    Erasing,
}

/// Exponential moving average over fingertip positions.
#[derive(Debug, Clone, Copy)]
struct Smoother {
    alpha: f64,
    value: Option<PointF>,
}

impl Smoother {
    fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    fn seed(&mut self, point: PointF) -> PointF {
        self.value = Some(point);
        point
    }

    fn update(&mut self, point: PointF) -> PointF {
        let next = match self.value {
            Some(prev) => PointF::new(
                prev.x + self.alpha * (point.x - prev.x),
                prev.y + self.alpha * (point.y - prev.y),
            ),
            None => point,
        };
        self.value = Some(next);
        next
    }

    fn reset(&mut self) {
        self.value = None;
    }
}

/// Draw-mode state plus every overlay it owns. Dropping or tearing down the
/// session releases all of them.
#[derive(Debug)]
pub struct DrawMode {
    config: DrawConfig,
    registry: OverlayRegistry,
    phase: DrawPhase,
    start_time: Option<Instant>,
    /// Last raw fingertip accepted into the current stroke.
    last_point: Option<PointF>,
    smoother: Smoother,
    smoothed_point: Option<PointF>,
    /// Pose currently acted on.
    last_gesture: Option<GestureType>,
    /// Candidate pose and when it was first seen. It replaces `last_gesture`
    /// once it has held for the switch debounce.
    pending_gesture: Option<(GestureType, Instant)>,
    open_palm_hold_start: Option<Instant>,
    last_erase_point: Option<PointF>,
    canvas: Option<DrawCanvas>,
    eraser: Option<EraserIndicator>,
    outline: Option<OverlayGuard>,
}

impl DrawMode {
    pub fn new(config: DrawConfig, registry: OverlayRegistry) -> Self {
        let smoother = Smoother::new(config.smoothing_alpha);
        Self {
            config,
            registry,
            phase: DrawPhase::Off,
            start_time: None,
            last_point: None,
            smoother,
            smoothed_point: None,
            last_gesture: None,
            pending_gesture: None,
            open_palm_hold_start: None,
            last_erase_point: None,
            canvas: None,
            eraser: None,
            outline: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.phase != DrawPhase::Off
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn canvas(&self) -> Option<&DrawCanvas> {
        self.canvas.as_ref()
    }

    pub fn eraser(&self) -> Option<&EraserIndicator> {
        self.eraser.as_ref()
    }

    /// Turns draw mode on. No pose is current until the startup delay has
    /// passed, so the first pose seen afterwards is taken without debounce.
    pub fn enter(
        &mut self,
        at: ScreenPoint,
        viewport: Viewport,
        toggled_by: GestureType,
        now: Instant,
    ) -> Option<UiEvent> {
        if self.is_enabled() {
            return None;
        }
        self.canvas = Some(DrawCanvas::new(
            &self.registry,
            viewport,
            self.config.stroke_color,
            self.config.stroke_width_px,
            self.config.eraser_radius_px,
        ));
        self.outline = Some(self.registry.acquire(OverlayKind::Outline));
        self.phase = DrawPhase::Armed;
        self.start_time = Some(now);
        self.last_gesture = None;
        self.pending_gesture = None;

        log_info!("draw mode on via {toggled_by} at ({}, {})", at.x, at.y);
        Some(UiEvent::DrawToggle { x: at.x, y: at.y })
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if let Some(canvas) = self.canvas.as_mut() {
            if canvas.resize(viewport) {
                log_info!("draw canvas resized to {}x{}", viewport.width, viewport.height);
            }
        }
    }

    /// Turns draw mode off through the toggle path.
    pub fn exit(&mut self, at: ScreenPoint) -> Option<UiEvent> {
        if !self.teardown() {
            return None;
        }
        Some(UiEvent::DrawToggle { x: at.x, y: at.y })
    }

    /// Releases every overlay and resets to OFF. Safe to call repeatedly;
    /// returns whether the mode was on.
    pub fn teardown(&mut self) -> bool {
        let was_enabled = self.is_enabled();
        self.canvas.take();
        self.eraser.take();
        self.outline.take();
        self.phase = DrawPhase::Off;
        self.start_time = None;
        self.last_gesture = None;
        self.pending_gesture = None;
        self.open_palm_hold_start = None;
        self.lift_pen();
        if was_enabled {
            log_info!("draw mode off");
        }
        was_enabled
    }

    /// Consumes one frame of the primary hand. The caller routes frames here
    /// instead of the normal dispatch while the mode is on.
    pub fn on_frame(&mut self, hand: Option<&Gesture>, viewport: Viewport, now: Instant) -> Vec<UiEvent> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let Some(gesture) = hand else {
            self.open_palm_hold_start = None;
            self.eraser.take();
            self.lift_pen();
            return Vec::new();
        };
        let Some(tip) = gesture.index_tip() else {
            return Vec::new();
        };
        let tip = project(&tip, viewport);

        if gesture.gesture_id == GestureType::OpenPalm {
            let held_since = *self.open_palm_hold_start.get_or_insert(now);
            if now.duration_since(held_since) >= self.config.cancel_hold() {
                log_info!("open palm held, cancelling draw mode");
                return self.exit(tip).into_iter().collect();
            }
        } else {
            self.open_palm_hold_start = None;
        }

        if self.phase == DrawPhase::Armed {
            let started = self.start_time.unwrap_or(now);
            if now.duration_since(started) < self.config.startup_delay() {
                return Vec::new();
            }
            self.phase = DrawPhase::Drawing;
        }

        let (effective, switched) = self.debounced_gesture(gesture.gesture_id, now);
        if switched {
            self.lift_pen();
        }
        let point = PointF::from(tip);

        match effective {
            GestureType::Draw => {
                self.phase = DrawPhase::Drawing;
                self.stop_erasing();
                self.stroke_to(point);
                Vec::new()
            }
            GestureType::ClosedFist => {
                self.phase = DrawPhase::Erasing;
                self.erase_towards(point);
                Vec::new()
            }
            GestureType::ThumbDown if switched => {
                self.phase = DrawPhase::Drawing;
                self.stop_erasing();
                let undone = self.canvas.as_mut().map(DrawCanvas::undo).unwrap_or(false);
                if undone {
                    vec![UiEvent::Undo]
                } else {
                    Vec::new()
                }
            }
            _ => {
                self.phase = DrawPhase::Drawing;
                self.stop_erasing();
                self.lift_pen();
                Vec::new()
            }
        }
    }

    /// A new pose takes effect only after it has persisted for the switch
    /// debounce; until then the previous pose stays in effect.
    fn debounced_gesture(&mut self, raw: GestureType, now: Instant) -> (GestureType, bool) {
        let Some(current) = self.last_gesture else {
            self.accept_gesture(raw);
            return (raw, true);
        };
        if current == raw {
            self.pending_gesture = None;
            return (raw, false);
        }

        let since = match self.pending_gesture {
            Some((pending, since)) if pending == raw => since,
            _ => {
                self.pending_gesture = Some((raw, now));
                now
            }
        };
        if now.duration_since(since) >= self.config.switch_debounce() {
            self.accept_gesture(raw);
            (raw, true)
        } else {
            (current, false)
        }
    }

    fn accept_gesture(&mut self, raw: GestureType) {
        log_debug!("draw pose {:?} -> {}", self.last_gesture, raw);
        self.last_gesture = Some(raw);
        self.pending_gesture = None;
    }

    fn stroke_to(&mut self, point: PointF) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let (Some(last), Some(smoothed_prev)) = (self.last_point, self.smoothed_point) else {
            canvas.begin_stroke();
            self.last_point = Some(point);
            self.smoothed_point = Some(self.smoother.seed(point));
            return;
        };

        let min = self.config.min_segment_distance_px;
        if last.distance_squared(point) < min * min {
            return;
        }
        let smoothed = self.smoother.update(point);
        canvas.line_to(smoothed_prev, smoothed);
        self.last_point = Some(point);
        self.smoothed_point = Some(smoothed);
    }

    fn erase_towards(&mut self, point: PointF) {
        let radius = self.config.eraser_radius_px;
        match self.eraser.as_mut() {
            Some(indicator) => indicator.center = point,
            None => self.eraser = Some(EraserIndicator::show(&self.registry, point, radius)),
        }

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let Some(last) = self.last_erase_point else {
            canvas.begin_erase();
            self.last_erase_point = Some(point);
            return;
        };
        let min = self.config.min_segment_distance_px;
        if last.distance_squared(point) >= min * min {
            canvas.erase_at(point);
            self.last_erase_point = Some(point);
        }
    }

    fn stop_erasing(&mut self) {
        self.eraser.take();
        self.last_erase_point = None;
    }

    fn lift_pen(&mut self) {
        self.last_point = None;
        self.smoothed_point = None;
        self.smoother.reset();
        self.last_erase_point = None;
    }
}
