use std::fmt;

use crate::dispatch::{ClickTargets, GestureMapping};
use crate::error::PipelineError;
use crate::gesture::{ClassifierConfig, Gesture, GestureStabilizer, Viewport};
use crate::modes::{DrawMode, OverlayRegistry, ZoomMode};
use crate::settings::PipelineSettings;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Which application view is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Presenting,
    Other(String),
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Presenting => f.write_str("presenting"),
            View::Other(name) => f.write_str(name),
        }
    }
}

/// Latest classification per hand, refreshed every frame.
#[derive(Debug, Clone, Default)]
pub struct FrameHands {
    pub left: Option<Gesture>,
    pub right: Option<Gesture>,
}

/// Everything the pipeline mutates between frames. Owned by the frame loop,
/// so there is a single writer.
#[derive(Debug)]
pub struct GestureRuntimeContext {
    pub mapping: GestureMapping,
    pub stabilizer: GestureStabilizer,
    pub classifier: ClassifierConfig,
    pub zoom: ZoomMode,
    pub draw: DrawMode,
    pub click_targets: ClickTargets,
    pub viewport: Viewport,
    pub detection_enabled: bool,
    pub frame: FrameHands,
    view: View,
    visible: bool,
}

impl GestureRuntimeContext {
    pub fn new(settings: &PipelineSettings, mapping: GestureMapping, overlays: OverlayRegistry) -> Self {
        Self {
            mapping,
            stabilizer: GestureStabilizer::new(settings.activation_threshold()),
            classifier: settings.classifier.clone(),
            zoom: ZoomMode::new(settings.zoom.clone()),
            draw: DrawMode::new(settings.draw.clone(), overlays),
            click_targets: ClickTargets::new(settings.click_targets.clone()),
            viewport: settings.viewport,
            detection_enabled: true,
            frame: FrameHands::default(),
            view: View::Presenting,
            visible: true,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Draw mode may only run on the presenting view of a visible tab.
    pub fn draw_context_valid(&self) -> bool {
        self.view == View::Presenting && self.visible
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.ensure_draw_context();
    }

    /// New viewport size. A live draw canvas is resized with it so strokes
    /// are not clipped to the old bounds.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.draw.resize(viewport);
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        self.ensure_draw_context();
    }

    /// Route change. Always ends draw mode, even back onto the same view.
    pub fn on_navigation(&mut self) {
        if self.draw.teardown() {
            log_info!("navigation, draw mode torn down");
        }
    }

    /// Tears draw mode down if it outlived its view. Returns whether it did.
    pub fn ensure_draw_context(&mut self) -> bool {
        if !self.draw.is_enabled() || self.draw_context_valid() {
            return false;
        }
        let reason = if self.visible {
            PipelineError::StaleContext {
                view: self.view.to_string(),
            }
            .to_string()
        } else {
            "tab hidden".to_string()
        };
        log_info!("forcing draw mode off: {reason}");
        self.draw.teardown()
    }

    /// Ends both modes and forgets held gestures. Used when the loop stops.
    pub fn shutdown(&mut self) {
        self.draw.teardown();
        self.zoom.exit();
        self.stabilizer.reset();
        self.frame = FrameHands::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{GestureType, ScreenPoint};
    use crate::modes::OverlayKind;
    use std::time::Instant;

    fn context(registry: &OverlayRegistry) -> GestureRuntimeContext {
        GestureRuntimeContext::new(
            &PipelineSettings::default(),
            GestureMapping::default(),
            registry.clone(),
        )
    }

    fn start_drawing(ctx: &mut GestureRuntimeContext) {
        let viewport = ctx.viewport;
        ctx.draw
            .enter(ScreenPoint::new(10, 10), viewport, GestureType::ILoveYou, Instant::now());
    }

    #[test]
    fn test_leaving_presenting_view_tears_down_draw() {
        let registry = OverlayRegistry::new();
        let mut ctx = context(&registry);
        start_drawing(&mut ctx);
        assert_eq!(registry.count(OverlayKind::Canvas), 1);

        ctx.set_view(View::Other("settings".into()));
        assert!(!ctx.draw.is_enabled());
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_hidden_tab_tears_down_draw() {
        let registry = OverlayRegistry::new();
        let mut ctx = context(&registry);
        start_drawing(&mut ctx);

        ctx.set_visibility(false);
        assert!(!ctx.draw.is_enabled());
        assert_eq!(registry.live(), 0);
        assert!(!ctx.ensure_draw_context());
    }

    #[test]
    fn test_navigation_tears_down_draw() {
        let registry = OverlayRegistry::new();
        let mut ctx = context(&registry);
        start_drawing(&mut ctx);

        ctx.on_navigation();
        ctx.on_navigation();
        assert!(!ctx.draw.is_enabled());
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_viewport_change_resizes_live_canvas() {
        let registry = OverlayRegistry::new();
        let mut ctx = context(&registry);
        start_drawing(&mut ctx);

        ctx.set_viewport(Viewport::new(2560, 1440));
        assert_eq!(ctx.viewport, Viewport::new(2560, 1440));
        let canvas = ctx.draw.canvas().unwrap();
        assert_eq!(canvas.image().dimensions(), (2560, 1440));
        assert_eq!(registry.count(OverlayKind::Canvas), 1);
    }

    #[test]
    fn test_view_change_without_draw_is_noop() {
        let registry = OverlayRegistry::new();
        let mut ctx = context(&registry);
        ctx.set_view(View::Other("upload".into()));
        assert_eq!(ctx.view().to_string(), "upload");
        assert!(!ctx.draw_context_valid());
        ctx.set_view(View::Presenting);
        assert!(ctx.draw_context_valid());
    }
}
