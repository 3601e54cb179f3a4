//! Two-hand zoom.
//!
//! Entering records the focal point and the starting separation of the two
//! index fingertips. While on, pulling the hands apart horizontally grows
//! `scaleX`; spreading them vertically shrinks `scaleY`. Both are normalized
//! against a fraction of the shorter viewport side and clamped.

use serde::{Deserialize, Serialize};

use crate::dispatch::UiEvent;
use crate::gesture::{PointF, ScreenPoint, Viewport};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomConfig {
    /// Share of min(width, height) that counts as one full scale unit.
    pub reference_fraction: f64,
    pub scale_x_min: f64,
    pub scale_x_max: f64,
    pub scale_y_min: f64,
    pub scale_y_max: f64,
    /// Floor for recorded separations, in pixels.
    pub min_separation_px: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            reference_fraction: 0.3,
            scale_x_min: 0.5,
            scale_x_max: 1.5,
            scale_y_min: 0.1,
            scale_y_max: 1.0,
            min_separation_px: 1.0,
        }
    }
}

impl ZoomConfig {
    pub fn clamp_scale_x(&self, raw: f64) -> f64 {
        raw.clamp(self.scale_x_min, self.scale_x_max)
    }

    pub fn clamp_scale_y(&self, raw: f64) -> f64 {
        raw.clamp(self.scale_y_min, self.scale_y_max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Separation {
    dx: f64,
    dy: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum ZoomState {
    Off,
    On {
        start_position: PointF,
        /// Captured on the first frame with both hands if missing at entry.
        baseline: Option<Separation>,
    },
}

#[derive(Debug, Clone)]
pub struct ZoomMode {
    config: ZoomConfig,
    state: ZoomState,
    indicator_visible: bool,
}

impl Default for ZoomMode {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}

impl ZoomMode {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            config,
            state: ZoomState::Off,
            indicator_visible: false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ZoomState::On { .. })
    }

    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    pub fn start_position(&self) -> Option<PointF> {
        match self.state {
            ZoomState::On { start_position, .. } => Some(start_position),
            ZoomState::Off => None,
        }
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Turns zoom on around the midpoint of the fingertips (or the single
    /// visible one). Returns None if no fingertip is available or zoom is
    /// already on.
    pub fn enter(&mut self, left: Option<ScreenPoint>, right: Option<ScreenPoint>) -> Option<UiEvent> {
        if self.is_active() {
            return None;
        }
        let start_position = match (left, right) {
            (Some(l), Some(r)) => PointF::from(l).midpoint(r.into()),
            (Some(p), None) | (None, Some(p)) => p.into(),
            (None, None) => return None,
        };
        let baseline = self.separation(left, right);
        self.state = ZoomState::On {
            start_position,
            baseline,
        };
        self.indicator_visible = true;

        let focal = start_position.rounded();
        log_info!("zoom on at ({}, {})", focal.x, focal.y);
        Some(UiEvent::ZoomToggle {
            x: focal.x,
            y: focal.y,
        })
    }

    /// Recomputes the scale from the current fingertips. Needs both hands.
    pub fn update(
        &mut self,
        left: Option<ScreenPoint>,
        right: Option<ScreenPoint>,
        viewport: Viewport,
    ) -> Option<UiEvent> {
        let current = self.separation(left, right)?;
        let ZoomState::On { baseline, .. } = &mut self.state else {
            return None;
        };
        let start = *baseline.get_or_insert(current);

        let reference = (self.config.reference_fraction * viewport.min_side()).max(1.0);
        let scale_x = self
            .config
            .clamp_scale_x(1.0 + (current.dx - start.dx) / reference);
        let scale_y = self
            .config
            .clamp_scale_y(1.0 - (current.dy - start.dy) / reference);

        Some(UiEvent::ZoomScale { scale_x, scale_y })
    }

    /// Turns zoom off and hides the indicator. Idempotent.
    pub fn exit(&mut self) -> Option<UiEvent> {
        let ZoomState::On { start_position, .. } = self.state else {
            return None;
        };
        self.state = ZoomState::Off;
        self.indicator_visible = false;

        let focal = start_position.rounded();
        log_info!("zoom off");
        Some(UiEvent::ZoomToggle {
            x: focal.x,
            y: focal.y,
        })
    }

    fn separation(&self, left: Option<ScreenPoint>, right: Option<ScreenPoint>) -> Option<Separation> {
        let (l, r) = (left?, right?);
        Some(Separation {
            dx: ((l.x - r.x).abs() as f64).max(self.config.min_separation_px),
            dy: ((l.y - r.y).abs() as f64).max(self.config.min_separation_px),
        })
    }
}
