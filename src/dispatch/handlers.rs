//! Function handlers. Each takes the activation that fired and produces at
//! most one UI event. Handlers never panic; missing or short landmark data
//! turns the call into a logged no-op.

use std::time::Instant;

use super::click::ClickAction;
use super::events::UiEvent;
use super::mapping::{FunctionType, GestureMapping};
use crate::gesture::types::INDEX_TIP;
use crate::gesture::{project, Activation, Gesture, GestureType, Landmark, PointF, ScreenPoint, Viewport};
use crate::runtime::GestureRuntimeContext;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Mapped function for a gesture, or None when it is UNUSED.
pub fn resolve(gesture: GestureType, mapping: &GestureMapping) -> Option<FunctionType> {
    match mapping.get(gesture) {
        FunctionType::Unused => {
            log_debug!("{gesture} is unused, ignoring");
            None
        }
        function => Some(function),
    }
}

pub fn invoke(
    function: FunctionType,
    activation: &Activation,
    ctx: &mut GestureRuntimeContext,
    now: Instant,
) -> Option<UiEvent> {
    let gesture = &activation.latest;
    match function {
        FunctionType::Unused => None,
        FunctionType::Select => {
            let point = focal_point(gesture, ctx.viewport, function)?;
            Some(UiEvent::Select {
                x: point.x,
                y: point.y,
            })
        }
        FunctionType::Filter => Some(UiEvent::Filter),
        FunctionType::Clear => Some(UiEvent::Clear),
        FunctionType::SwitchChart => Some(UiEvent::SwitchChart),
        FunctionType::SwitchData => Some(UiEvent::SwitchData),
        FunctionType::Zoom => zoom(gesture, ctx),
        FunctionType::Click => click(gesture, ctx, function),
        FunctionType::Draw => draw(gesture, ctx, function, now),
    }
}

fn zoom(gesture: &Gesture, ctx: &mut GestureRuntimeContext) -> Option<UiEvent> {
    let (left, right) = fingertips(gesture, ctx);
    if ctx.zoom.is_active() {
        ctx.zoom.update(left, right, ctx.viewport)
    } else {
        let event = ctx.zoom.enter(left, right);
        if event.is_none() {
            log_warn!("zoom: no fingertip in {}", gesture.gesture_id);
        }
        event
    }
}

fn click(gesture: &Gesture, ctx: &mut GestureRuntimeContext, function: FunctionType) -> Option<UiEvent> {
    let point = focal_point(gesture, ctx.viewport, function)?;
    let Some(region) = ctx.click_targets.hit(point) else {
        log_debug!("click at ({}, {}) outside whitelisted targets", point.x, point.y);
        return None;
    };
    let target = region.id.clone();
    if region.action == ClickAction::ToggleDetection {
        ctx.detection_enabled = !ctx.detection_enabled;
        log_info!(
            "gesture detection {}",
            if ctx.detection_enabled { "enabled" } else { "paused" }
        );
    }
    Some(UiEvent::Click {
        x: point.x,
        y: point.y,
        target,
    })
}

fn draw(
    gesture: &Gesture,
    ctx: &mut GestureRuntimeContext,
    function: FunctionType,
    now: Instant,
) -> Option<UiEvent> {
    let point = focal_point(gesture, ctx.viewport, function)?;
    if ctx.draw.is_enabled() {
        return ctx.draw.exit(point);
    }
    if !ctx.draw_context_valid() {
        log_info!("draw toggle ignored outside the presenting view ({})", ctx.view());
        return None;
    }
    ctx.draw.enter(point, ctx.viewport, gesture.gesture_id, now)
}

/// Index fingertip for single-hand gestures, midpoint of both index
/// fingertips for composites.
fn focal_point(gesture: &Gesture, viewport: Viewport, function: FunctionType) -> Option<ScreenPoint> {
    let point = match gesture.double_landmarks() {
        Some((left, right)) => match (tip(left, viewport), tip(right, viewport)) {
            (Some(l), Some(r)) => Some(PointF::from(l).midpoint(r.into()).rounded()),
            _ => None,
        },
        None => gesture.index_tip().map(|landmark| project(&landmark, viewport)),
    };
    if point.is_none() {
        log_warn!(
            "{function}: {} carried no usable fingertip, ignoring",
            gesture.gesture_id
        );
    }
    point
}

/// Left and right fingertips from a composite, falling back to the hands seen
/// this frame.
fn fingertips(gesture: &Gesture, ctx: &GestureRuntimeContext) -> (Option<ScreenPoint>, Option<ScreenPoint>) {
    let viewport = ctx.viewport;
    if let Some((left, right)) = gesture.double_landmarks() {
        return (tip(left, viewport), tip(right, viewport));
    }
    let frame_tip = |hand: &Option<Gesture>| {
        hand.as_ref()
            .and_then(Gesture::index_tip)
            .map(|landmark| project(&landmark, viewport))
    };
    (frame_tip(&ctx.frame.left), frame_tip(&ctx.frame.right))
}

fn tip(landmarks: &[Landmark], viewport: Viewport) -> Option<ScreenPoint> {
    landmarks.get(INDEX_TIP).map(|landmark| project(landmark, viewport))
}
