//! Overlay resources owned by interaction modes.
//!
//! Every overlay a mode puts on screen (drawing surface, eraser ring, view
//! outline) is represented by an [`OverlayGuard`]. Dropping the guard removes
//! the overlay from the registry, so releasing a mode's state is enough to
//! clean up after it no matter which path ended the mode.

use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::gesture::{PointF, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Canvas,
    EraserIndicator,
    Outline,
}

/// Shared record of overlays currently on screen.
#[derive(Debug, Clone, Default)]
pub struct OverlayRegistry {
    live: Arc<Mutex<HashMap<Uuid, OverlayKind>>>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, kind: OverlayKind) -> OverlayGuard {
        let id = Uuid::new_v4();
        self.lock().insert(id, kind);
        OverlayGuard {
            id,
            kind,
            registry: self.clone(),
        }
    }

    pub fn count(&self, kind: OverlayKind) -> usize {
        self.lock().values().filter(|&&k| k == kind).count()
    }

    pub fn live(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, OverlayKind>> {
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug)]
pub struct OverlayGuard {
    id: Uuid,
    kind: OverlayKind,
    registry: OverlayRegistry,
}

impl OverlayGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

/// Eraser ring that follows the fist while erasing.
#[derive(Debug)]
pub struct EraserIndicator {
    _guard: OverlayGuard,
    pub center: PointF,
    pub radius: f64,
}

impl EraserIndicator {
    pub fn show(registry: &OverlayRegistry, center: PointF, radius: f64) -> Self {
        Self {
            _guard: registry.acquire(OverlayKind::EraserIndicator),
            center,
            radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: PointF,
    pub to: PointF,
}

#[derive(Debug, Clone, PartialEq)]
enum CanvasAction {
    Stroke(Vec<Segment>),
    Erase(Vec<PointF>),
}

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Transparent raster surface laid over the presenting view.
///
/// Actions (one stroke or one erase pass each) are kept so the last one can
/// be undone by re-rasterizing the rest.
#[derive(Debug)]
pub struct DrawCanvas {
    _guard: OverlayGuard,
    image: RgbaImage,
    actions: Vec<CanvasAction>,
    stroke_color: Rgba<u8>,
    stroke_width: f64,
    eraser_radius: f64,
}

impl DrawCanvas {
    pub fn new(
        registry: &OverlayRegistry,
        viewport: Viewport,
        stroke_color: [u8; 4],
        stroke_width: f64,
        eraser_radius: f64,
    ) -> Self {
        Self {
            _guard: registry.acquire(OverlayKind::Canvas),
            image: RgbaImage::from_pixel(viewport.width, viewport.height, TRANSPARENT),
            actions: Vec::new(),
            stroke_color: Rgba(stroke_color),
            stroke_width,
            eraser_radius,
        }
    }

    /// Starts a new stroke; following segments belong to it until the next
    /// stroke or erase.
    pub fn begin_stroke(&mut self) {
        self.actions.push(CanvasAction::Stroke(Vec::new()));
    }

    pub fn begin_erase(&mut self) {
        self.actions.push(CanvasAction::Erase(Vec::new()));
    }

    pub fn line_to(&mut self, from: PointF, to: PointF) {
        let segment = Segment { from, to };
        match self.actions.last_mut() {
            Some(CanvasAction::Stroke(segments)) => segments.push(segment),
            _ => self.actions.push(CanvasAction::Stroke(vec![segment])),
        }
        stroke_segment(&mut self.image, &segment, self.stroke_width, self.stroke_color);
    }

    pub fn erase_at(&mut self, center: PointF) {
        match self.actions.last_mut() {
            Some(CanvasAction::Erase(centers)) => centers.push(center),
            _ => self.actions.push(CanvasAction::Erase(vec![center])),
        }
        clear_disk(&mut self.image, center, self.eraser_radius);
    }

    /// Drops the most recent non-empty action. Returns false when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        while let Some(action) = self.actions.pop() {
            let empty = match &action {
                CanvasAction::Stroke(segments) => segments.is_empty(),
                CanvasAction::Erase(centers) => centers.is_empty(),
            };
            if !empty {
                self.rerender();
                return true;
            }
        }
        false
    }

    /// Matches the raster to a new viewport and repaints the history onto it.
    /// Returns whether the size changed.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if self.image.dimensions() == (viewport.width, viewport.height) {
            return false;
        }
        self.image = RgbaImage::from_pixel(viewport.width, viewport.height, TRANSPARENT);
        self.rerender();
        true
    }

    pub fn segment_count(&self) -> usize {
        self.actions
            .iter()
            .map(|action| match action {
                CanvasAction::Stroke(segments) => segments.len(),
                CanvasAction::Erase(_) => 0,
            })
            .sum()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.actions.iter().flat_map(stroke_segments)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .map(|pixel| pixel[3] != 0)
            .unwrap_or(false)
    }

    fn rerender(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
        for action in &self.actions {
            match action {
                CanvasAction::Stroke(segments) => {
                    for segment in segments {
                        stroke_segment(&mut self.image, segment, self.stroke_width, self.stroke_color);
                    }
                }
                CanvasAction::Erase(centers) => {
                    for &center in centers {
                        clear_disk(&mut self.image, center, self.eraser_radius);
                    }
                }
            }
        }
    }
}

fn stroke_segments(action: &CanvasAction) -> &[Segment] {
    match action {
        CanvasAction::Stroke(segments) => segments,
        CanvasAction::Erase(_) => &[],
    }
}

/// Paints every pixel whose center lies within `width / 2` of the segment.
fn stroke_segment(image: &mut RgbaImage, segment: &Segment, width: f64, color: Rgba<u8>) {
    let half = (width / 2.0).max(0.5);
    let min_x = segment.from.x.min(segment.to.x) - half;
    let max_x = segment.from.x.max(segment.to.x) + half;
    let min_y = segment.from.y.min(segment.to.y) - half;
    let max_y = segment.from.y.max(segment.to.y) + half;

    for_each_pixel(image, min_x, max_x, min_y, max_y, |x, y, pixel| {
        let center = PointF::new(x as f64 + 0.5, y as f64 + 0.5);
        if distance_to_segment(center, segment) <= half {
            *pixel = color;
        }
    });
}

fn clear_disk(image: &mut RgbaImage, center: PointF, radius: f64) {
    let radius_sq = radius * radius;
    for_each_pixel(
        image,
        center.x - radius,
        center.x + radius,
        center.y - radius,
        center.y + radius,
        |x, y, pixel| {
            let p = PointF::new(x as f64 + 0.5, y as f64 + 0.5);
            if p.distance_squared(center) <= radius_sq {
                *pixel = TRANSPARENT;
            }
        },
    );
}

fn for_each_pixel<F>(image: &mut RgbaImage, min_x: f64, max_x: f64, min_y: f64, max_y: f64, mut f: F)
where
    F: FnMut(u32, u32, &mut Rgba<u8>),
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || max_x < 0.0 || max_y < 0.0 {
        return;
    }
    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil() as u32).min(width - 1);
    let y1 = (max_y.ceil() as u32).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            f(x, y, image.get_pixel_mut(x, y));
        }
    }
}

fn distance_to_segment(p: PointF, segment: &Segment) -> f64 {
    let (a, b) = (segment.from, segment.to);
    let length_sq = a.distance_squared(b);
    if length_sq == 0.0 {
        return p.distance_squared(a).sqrt();
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / length_sq).clamp(0.0, 1.0);
    let projected = PointF::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance_squared(projected).sqrt()
}
