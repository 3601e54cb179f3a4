//! Whitelist of on-screen regions a gesture click may hit.

use serde::{Deserialize, Serialize};

use crate::gesture::ScreenPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Half-open containment. Bounds are widened to i64 since rectangles
    /// come from the settings file and may sit near `i32::MAX`.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        let inside = |p: i32, start: i32, len: i32| {
            let offset = i64::from(p) - i64::from(start);
            offset >= 0 && offset < i64::from(len)
        };
        inside(point.x, self.x, self.width) && inside(point.y, self.y, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickAction {
    /// Forward a pointer click to the element.
    #[default]
    Press,
    /// The gesture-detection on/off button.
    ToggleDetection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRegion {
    pub id: String,
    pub rect: Rect,
    #[serde(default)]
    pub action: ClickAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickTargets {
    regions: Vec<ClickRegion>,
}

impl ClickTargets {
    pub fn new(regions: Vec<ClickRegion>) -> Self {
        Self { regions }
    }

    /// Topmost region under the point; later regions sit above earlier ones.
    pub fn hit(&self, point: ScreenPoint) -> Option<&ClickRegion> {
        self.regions.iter().rev().find(|region| region.rect.contains(point))
    }

    pub fn regions(&self) -> &[ClickRegion] {
        &self.regions
    }
}
