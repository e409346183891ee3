//! Viewport module for pan/zoom transforms.

use crate::config::SessionConfig;
use crate::geometry;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom level that corresponds to "100%" in the UI.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Viewport manages the session-local view transform for the board.
///
/// It maps between screen space (pointer pixels) and world space (where
/// images and strokes live): `world = (screen - offset) / zoom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current pan offset in screen pixels.
    pub offset: Vec2,
    /// Current zoom level, always within `[min_zoom, max_zoom]`.
    zoom: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: DEFAULT_ZOOM,
            min_zoom: 0.5,
            max_zoom: 3.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport using the zoom bounds from `config`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: DEFAULT_ZOOM.clamp(config.min_zoom, config.max_zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Current zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom level, clamped to the allowed range. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.zoom = geometry::clamp(zoom, self.min_zoom, self.max_zoom);
        }
        self.zoom
    }

    /// Change zoom by `delta`, keeping the pan offset (fixed visual origin).
    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.set_zoom(self.zoom + delta)
    }

    /// Change zoom by `delta` while keeping `screen_point` over the same world point.
    pub fn zoom_by_at(&mut self, delta: f64, screen_point: Point) -> f64 {
        let world_point = self.screen_to_world(screen_point);
        self.zoom_by(delta);
        let new_screen = self.world_to_screen(world_point);
        self.offset += screen_point - new_screen;
        self.zoom
    }

    /// World-to-screen transform for rendering.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen-to-world transform for input handling.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        geometry::screen_to_world(screen_point, self.offset, self.zoom)
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        geometry::world_to_screen(world_point, self.offset, self.zoom)
    }

    /// Convert a screen-space length into world units.
    pub fn screen_len_to_world(&self, len: f64) -> f64 {
        len / self.zoom
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Reset zoom to 100%; the pan offset is left alone.
    pub fn reset_zoom(&mut self) {
        self.set_zoom(DEFAULT_ZOOM);
    }
}
