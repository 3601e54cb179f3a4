//! One frame through the pipeline: split hands, classify, let an active mode
//! intercept, stabilize, resolve and dispatch.

use std::time::Instant;

use super::context::{FrameHands, GestureRuntimeContext};
use crate::dispatch::handlers::{invoke, resolve};
use crate::dispatch::{FunctionType, UiEvent};
use crate::gesture::{
    classify_hand, combine_hands, project, Activation, Gesture, GestureType, HandDetection,
    Handedness,
};

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Processes one frame of detections and returns the UI events it produced.
pub fn process_frame(
    ctx: &mut GestureRuntimeContext,
    detections: &[HandDetection],
    now: Instant,
) -> Vec<UiEvent> {
    ctx.ensure_draw_context();

    let draw_active = ctx.draw.is_enabled();
    let (left, right) = split_hands(detections);
    let classifier = &ctx.classifier;
    let frame = FrameHands {
        left: left.map(|d| classify_hand(d, draw_active, classifier, now)),
        right: right.map(|d| classify_hand(d, draw_active, classifier, now)),
    };
    ctx.frame = frame;

    let mut events = Vec::new();
    if !ctx.detection_enabled {
        paused_frame(ctx, now, &mut events);
    } else if ctx.draw.is_enabled() {
        draw_frame(ctx, now, &mut events);
    } else if ctx.zoom.is_active() {
        zoom_frame(ctx, &mut events);
    } else {
        for activation in stabilize(ctx, now) {
            dispatch(ctx, &activation, now, &mut events);
        }
    }
    events
}

/// Highest-confidence detection per side. Detections labelled BOTH are not
/// real hands and are dropped.
fn split_hands(detections: &[HandDetection]) -> (Option<&HandDetection>, Option<&HandDetection>) {
    let best = |side: Handedness| {
        detections
            .iter()
            .filter(|d| d.handedness == side)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    };
    (best(Handedness::Left), best(Handedness::Right))
}

/// Feeds the stabilizer. A two-hand composite owns the frame: it goes to the
/// BOTH slot and the per-hand holds restart.
fn stabilize(ctx: &mut GestureRuntimeContext, now: Instant) -> Vec<Activation> {
    let FrameHands { left, right } = ctx.frame.clone();
    let stabilizer = &mut ctx.stabilizer;

    match combine_hands(left.as_ref(), right.as_ref(), now) {
        Some(both) => {
            stabilizer.clear(Handedness::Left);
            stabilizer.clear(Handedness::Right);
            stabilizer
                .observe(Handedness::Both, Some(both), now, false)
                .into_iter()
                .collect()
        }
        None => {
            stabilizer.clear(Handedness::Both);
            [(Handedness::Left, left), (Handedness::Right, right)]
                .into_iter()
                .filter_map(|(side, gesture)| stabilizer.observe(side, gesture, now, false))
                .collect()
        }
    }
}

fn dispatch(ctx: &mut GestureRuntimeContext, activation: &Activation, now: Instant, events: &mut Vec<UiEvent>) {
    if let Some(function) = resolve(activation.latest.gesture_id, &ctx.mapping) {
        events.extend(invoke(function, activation, ctx, now));
    }
}

/// Detection paused: only PINCH passes, so the toggle button stays reachable.
fn paused_frame(ctx: &mut GestureRuntimeContext, now: Instant, events: &mut Vec<UiEvent>) {
    let pinch_only = |hand: &Option<Gesture>| {
        hand.clone()
            .filter(|gesture| gesture.gesture_id == GestureType::Pinch)
    };
    let left = pinch_only(&ctx.frame.left);
    let right = pinch_only(&ctx.frame.right);

    ctx.stabilizer.clear(Handedness::Both);
    let fired: Vec<Activation> = [(Handedness::Left, left), (Handedness::Right, right)]
        .into_iter()
        .filter_map(|(side, gesture)| ctx.stabilizer.observe(side, gesture, now, false))
        .collect();
    for activation in fired {
        dispatch(ctx, &activation, now, events);
    }
}

/// Draw mode owns the frame. The primary hand (right if present) drives the
/// pen, and only the DRAW function can still fire so the mode can be toggled
/// off.
fn draw_frame(ctx: &mut GestureRuntimeContext, now: Instant, events: &mut Vec<UiEvent>) {
    let primary = ctx.frame.right.clone().or_else(|| ctx.frame.left.clone());
    let viewport = ctx.viewport;
    events.extend(ctx.draw.on_frame(primary.as_ref(), viewport, now));

    if !ctx.draw.is_enabled() {
        ctx.stabilizer.reset();
        return;
    }

    let primary_side = primary.as_ref().map(|gesture| gesture.handedness);
    ctx.stabilizer.clear(Handedness::Both);
    let mut fired = Vec::new();
    for side in [Handedness::Left, Handedness::Right] {
        let gesture = primary.clone().filter(|_| primary_side == Some(side));
        fired.extend(ctx.stabilizer.observe(side, gesture, now, false));
    }

    for activation in fired {
        if ctx.mapping.get(activation.latest.gesture_id) == FunctionType::Draw {
            events.extend(invoke(FunctionType::Draw, &activation, ctx, now));
        }
    }
}

/// Zoom mode intercepts every frame. A fist on either hand leaves it; any
/// frame with both hands present rescales from their index fingertips,
/// whatever pose they hold. Discrete functions are held back.
fn zoom_frame(ctx: &mut GestureRuntimeContext, events: &mut Vec<UiEvent>) {
    let fist = [&ctx.frame.left, &ctx.frame.right]
        .into_iter()
        .flatten()
        .any(|gesture| gesture.gesture_id == GestureType::ClosedFist);
    if fist {
        events.extend(ctx.zoom.exit());
        ctx.stabilizer.reset();
        return;
    }

    let viewport = ctx.viewport;
    let tip = |hand: &Option<Gesture>| {
        hand.as_ref()
            .and_then(Gesture::index_tip)
            .map(|landmark| project(&landmark, viewport))
    };
    match (tip(&ctx.frame.left), tip(&ctx.frame.right)) {
        (Some(left), Some(right)) => {
            events.extend(ctx.zoom.update(Some(left), Some(right), viewport));
        }
        _ => log_debug!("zoom waiting for both hands"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::dispatch::{ClickAction, ClickRegion, ClickTargets, GestureMapping, Rect};
    use crate::gesture::classifier::{draw_hand, pinch_hand, pointing_hand, relaxed_fist};
    use crate::gesture::types::INDEX_TIP;
    use crate::gesture::{Landmark, ScreenPoint, Viewport};
    use crate::modes::{DrawPhase, OverlayKind, OverlayRegistry};
    use crate::runtime::View;
    use crate::settings::PipelineSettings;

    fn context(mapping: GestureMapping) -> (GestureRuntimeContext, OverlayRegistry) {
        let registry = OverlayRegistry::new();
        let mut settings = PipelineSettings::default();
        settings.viewport = Viewport::new(1000, 1000);
        settings.click_targets = Vec::new();
        let ctx = GestureRuntimeContext::new(&settings, mapping, registry.clone());
        (ctx, registry)
    }

    /// Moves a hand so its index tip projects to (x, y) in a 1000x1000 view.
    fn placed(hand: Vec<Landmark>, x: i32, y: i32) -> Vec<Landmark> {
        let tip = hand[INDEX_TIP];
        let (dx, dy) = (1.0 - x as f64 / 1000.0 - tip.x, y as f64 / 1000.0 - tip.y);
        hand.into_iter()
            .map(|p| Landmark {
                x: p.x + dx,
                y: p.y + dy,
                z: p.z,
            })
            .collect()
    }

    fn detection(landmarks: Vec<Landmark>, handedness: Handedness, label: Option<&str>) -> HandDetection {
        HandDetection {
            landmarks,
            handedness,
            builtin_label: label.map(str::to_string),
            confidence: 0.9,
        }
    }

    fn fist(handedness: Handedness) -> HandDetection {
        detection(relaxed_fist(), handedness, Some("Closed_Fist"))
    }

    fn ms(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    fn filter_only() -> GestureMapping {
        let mut mapping = GestureMapping::unused();
        mapping.assign(GestureType::ClosedFist, FunctionType::Filter);
        mapping
    }

    #[test]
    fn test_fist_held_600ms_filters_once() {
        let (mut ctx, _) = context(filter_only());
        let t0 = Instant::now();

        assert!(process_frame(&mut ctx, &[fist(Handedness::Right)], t0).is_empty());
        let events = process_frame(&mut ctx, &[fist(Handedness::Right)], ms(t0, 600));
        assert_eq!(events, vec![UiEvent::Filter]);
    }

    #[test]
    fn test_continuous_frames_fire_once_per_threshold() {
        let (mut ctx, _) = context(filter_only());
        let t0 = Instant::now();

        let mut fired_at = Vec::new();
        for step in 0..=120 {
            let at = step * 10;
            let events = process_frame(&mut ctx, &[fist(Handedness::Left)], ms(t0, at));
            if events.contains(&UiEvent::Filter) {
                fired_at.push(at);
            }
        }
        assert_eq!(fired_at, vec![500, 1000]);
    }

    #[test]
    fn test_unused_gesture_emits_nothing() {
        let (mut ctx, _) = context(GestureMapping::unused());
        let t0 = Instant::now();
        for at in [0, 300, 600, 900] {
            assert!(process_frame(&mut ctx, &[fist(Handedness::Right)], ms(t0, at)).is_empty());
        }
    }

    #[test]
    fn test_highest_confidence_detection_wins_per_side() {
        let (mut ctx, _) = context(filter_only());
        let t0 = Instant::now();
        let mut weak = detection(relaxed_fist(), Handedness::Right, Some("Open_Palm"));
        weak.confidence = 0.2;
        let frame = [weak, fist(Handedness::Right)];

        process_frame(&mut ctx, &frame, t0);
        assert_eq!(ctx.frame.right.as_ref().map(|g| g.gesture_id), Some(GestureType::ClosedFist));
        assert_eq!(process_frame(&mut ctx, &frame, ms(t0, 500)), vec![UiEvent::Filter]);
    }

    #[test]
    fn test_select_at_pointing_fingertip() {
        let (mut ctx, _) = context(GestureMapping::default());
        let t0 = Instant::now();
        let hand = detection(placed(pointing_hand(), 250, 300), Handedness::Right, None);

        process_frame(&mut ctx, &[hand.clone()], t0);
        let events = process_frame(&mut ctx, &[hand], ms(t0, 500));
        assert_eq!(events, vec![UiEvent::Select { x: 250, y: 300 }]);
    }

    #[test]
    fn test_toggle_draw_then_draw_one_segment() {
        let mut mapping = GestureMapping::default();
        mapping.assign(GestureType::ILoveYou, FunctionType::Draw);
        let (mut ctx, registry) = context(mapping);
        let t0 = Instant::now();

        let toggle = detection(placed(relaxed_fist(), 100, 100), Handedness::Right, Some("ILoveYou"));
        assert!(process_frame(&mut ctx, &[toggle.clone()], t0).is_empty());
        let events = process_frame(&mut ctx, &[toggle], ms(t0, 500));
        assert_eq!(events, vec![UiEvent::DrawToggle { x: 100, y: 100 }]);
        assert_eq!(registry.count(OverlayKind::Canvas), 1);

        let pen = |x| detection(placed(draw_hand(), x, 100), Handedness::Right, None);
        assert!(process_frame(&mut ctx, &[pen(100)], ms(t0, 1100)).is_empty());
        assert!(process_frame(&mut ctx, &[pen(103)], ms(t0, 1110)).is_empty());

        let canvas = ctx.draw.canvas().unwrap();
        assert_eq!(canvas.segment_count(), 1);
        let segment = canvas.segments().next().unwrap();
        assert_eq!((segment.from.x, segment.from.y), (100.0, 100.0));
        assert_eq!((segment.to.x, segment.to.y), (100.75, 100.0));
        assert_eq!(ctx.draw.phase(), DrawPhase::Drawing);
    }

    #[test]
    fn test_draw_jitter_below_threshold_draws_nothing() {
        let mut mapping = GestureMapping::default();
        mapping.assign(GestureType::ILoveYou, FunctionType::Draw);
        let (mut ctx, _) = context(mapping);
        let t0 = Instant::now();

        let toggle = detection(placed(relaxed_fist(), 100, 100), Handedness::Right, Some("ILoveYou"));
        process_frame(&mut ctx, &[toggle.clone()], t0);
        process_frame(&mut ctx, &[toggle], ms(t0, 500));

        let pen = |x| detection(placed(draw_hand(), x, 100), Handedness::Right, None);
        process_frame(&mut ctx, &[pen(100)], ms(t0, 1100));
        process_frame(&mut ctx, &[pen(101)], ms(t0, 1110));
        assert_eq!(ctx.draw.canvas().unwrap().segment_count(), 0);
    }

    #[test]
    fn test_draw_suppresses_other_functions() {
        let mut mapping = GestureMapping::default();
        mapping.assign(GestureType::ILoveYou, FunctionType::Draw);
        let (mut ctx, _) = context(mapping);
        let t0 = Instant::now();
        let viewport = ctx.viewport;
        ctx.draw.enter(ScreenPoint::new(10, 10), viewport, GestureType::ILoveYou, t0);

        for at in (600..=1800).step_by(100) {
            let events = process_frame(&mut ctx, &[fist(Handedness::Right)], ms(t0, at));
            assert!(!events.contains(&UiEvent::Filter));
        }
        assert_eq!(ctx.draw.phase(), DrawPhase::Erasing);
    }

    #[test]
    fn test_leaving_view_mid_draw_releases_overlays() {
        let mut mapping = GestureMapping::default();
        mapping.assign(GestureType::ILoveYou, FunctionType::Draw);
        let (mut ctx, registry) = context(mapping);
        let t0 = Instant::now();
        let toggle = detection(placed(relaxed_fist(), 100, 100), Handedness::Right, Some("ILoveYou"));
        process_frame(&mut ctx, &[toggle.clone()], t0);
        process_frame(&mut ctx, &[toggle], ms(t0, 500));
        assert!(registry.live() > 0);

        ctx.set_view(View::Other("settings".into()));
        assert_eq!(registry.live(), 0);
        assert!(!ctx.draw.is_enabled());
    }

    #[test]
    fn test_double_pinch_zoom_cycle() {
        let (mut ctx, _) = context(GestureMapping::default());
        let t0 = Instant::now();
        let hands = |lx, rx| {
            [
                detection(placed(pinch_hand(), lx, 500), Handedness::Left, None),
                detection(placed(pinch_hand(), rx, 500), Handedness::Right, None),
            ]
        };

        assert!(process_frame(&mut ctx, &hands(400, 600), t0).is_empty());
        let entered = process_frame(&mut ctx, &hands(400, 600), ms(t0, 500));
        assert_eq!(entered, vec![UiEvent::ZoomToggle { x: 500, y: 500 }]);
        assert!(ctx.zoom.is_active());

        let steady = process_frame(&mut ctx, &hands(400, 600), ms(t0, 510));
        assert_eq!(
            steady,
            vec![UiEvent::ZoomScale {
                scale_x: 1.0,
                scale_y: 1.0
            }]
        );

        let wider = process_frame(&mut ctx, &hands(325, 675), ms(t0, 520));
        match wider.as_slice() {
            [UiEvent::ZoomScale { scale_x, .. }] => assert!((scale_x - 1.5).abs() < 1e-9),
            other => panic!("unexpected events {other:?}"),
        }

        let exit = process_frame(
            &mut ctx,
            &[
                fist(Handedness::Left),
                detection(placed(pinch_hand(), 600, 500), Handedness::Right, None),
            ],
            ms(t0, 530),
        );
        assert_eq!(exit, vec![UiEvent::ZoomToggle { x: 500, y: 500 }]);
        assert!(!ctx.zoom.is_active());
        assert!(!ctx.zoom.indicator_visible());
    }

    #[test]
    fn test_zoom_streams_while_open_hands_spread() {
        let (mut ctx, _) = context(GestureMapping::default());
        let t0 = Instant::now();
        let pinches = [
            detection(placed(pinch_hand(), 400, 500), Handedness::Left, None),
            detection(placed(pinch_hand(), 600, 500), Handedness::Right, None),
        ];
        process_frame(&mut ctx, &pinches, t0);
        let entered = process_frame(&mut ctx, &pinches, ms(t0, 500));
        assert_eq!(entered, vec![UiEvent::ZoomToggle { x: 500, y: 500 }]);

        let open = |lx, rx| {
            [
                detection(placed(relaxed_fist(), lx, 500), Handedness::Left, Some("Open_Palm")),
                detection(placed(relaxed_fist(), rx, 500), Handedness::Right, Some("Open_Palm")),
            ]
        };
        let mut scales = Vec::new();
        for step in 0..10u64 {
            let spread = step as i32 * 5;
            for event in process_frame(&mut ctx, &open(400 - spread, 600 + spread), ms(t0, 510 + step * 10)) {
                match event {
                    UiEvent::ZoomScale { scale_x, .. } => scales.push(scale_x),
                    other => panic!("unexpected event {other:?}"),
                }
            }
        }

        assert_eq!(scales.len(), 10);
        assert_eq!(scales[0], 1.0);
        assert!(scales.windows(2).all(|pair| pair[1] > pair[0]));
        assert!((scales[9] - (1.0 + 90.0 / 300.0)).abs() < 1e-9);
        assert!(ctx.zoom.is_active());
    }

    #[test]
    fn test_zoom_ignores_frames_with_one_hand() {
        let (mut ctx, _) = context(GestureMapping::default());
        ctx.zoom.enter(Some(ScreenPoint::new(400, 500)), Some(ScreenPoint::new(600, 500)));
        let t0 = Instant::now();
        let lone = detection(placed(pinch_hand(), 600, 500), Handedness::Right, None);

        assert!(process_frame(&mut ctx, &[lone], t0).is_empty());
        assert!(ctx.zoom.is_active());
    }

    #[test]
    fn test_zoom_holds_back_discrete_functions() {
        let (mut ctx, _) = context(GestureMapping::default());
        ctx.zoom.enter(Some(ScreenPoint::new(400, 500)), Some(ScreenPoint::new(600, 500)));
        let t0 = Instant::now();
        let pointing = detection(placed(pointing_hand(), 300, 300), Handedness::Right, None);

        for at in (0..=1000).step_by(100) {
            let events = process_frame(&mut ctx, &[pointing.clone()], ms(t0, at));
            assert!(events.is_empty());
        }
        assert!(ctx.zoom.is_active());
    }

    #[test]
    fn test_paused_detection_only_passes_pinch() {
        let (mut ctx, _) = context(GestureMapping::default());
        ctx.click_targets = ClickTargets::new(vec![ClickRegion {
            id: "detection-toggle".into(),
            rect: Rect {
                x: 0,
                y: 0,
                width: 200,
                height: 200,
            },
            action: ClickAction::ToggleDetection,
        }]);
        ctx.detection_enabled = false;
        let t0 = Instant::now();

        process_frame(&mut ctx, &[fist(Handedness::Right)], t0);
        assert!(process_frame(&mut ctx, &[fist(Handedness::Right)], ms(t0, 600)).is_empty());

        let pinch = detection(placed(pinch_hand(), 50, 50), Handedness::Right, None);
        process_frame(&mut ctx, &[pinch.clone()], ms(t0, 700));
        let events = process_frame(&mut ctx, &[pinch], ms(t0, 1200));
        assert_eq!(
            events,
            vec![UiEvent::Click {
                x: 50,
                y: 50,
                target: "detection-toggle".into()
            }]
        );
        assert!(ctx.detection_enabled);
    }
}
