//! Normalized landmark coordinates to viewport pixels.
//!
//! The camera image is mirrored, so x is flipped; y passes through. Depth is
//! ignored. The viewport is passed on every call because it can change between
//! frames.

use serde::{Deserialize, Serialize};

use super::types::Landmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sub-pixel screen position, used where points are smoothed or interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: PointF) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn midpoint(&self, other: PointF) -> PointF {
        PointF::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn rounded(&self) -> ScreenPoint {
        ScreenPoint::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl From<ScreenPoint> for PointF {
    fn from(point: ScreenPoint) -> Self {
        PointF::new(point.x as f64, point.y as f64)
    }
}

pub fn project(landmark: &Landmark, viewport: Viewport) -> ScreenPoint {
    ScreenPoint {
        x: ((1.0 - landmark.x) * viewport.width as f64).round() as i32,
        y: (landmark.y * viewport.height as f64).round() as i32,
    }
}
