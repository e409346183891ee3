//! Canvas state: scene plus the session-local view of it.

use crate::config::{SessionConfig, ZoomAnchor};
use crate::drawing::{Brush, DrawingSettings};
use crate::image::{BoardImage, ImageId};
use crate::input::WheelEvent;
use crate::scene::Scene;
use crate::selection::{self, PickResult, Selection};
use crate::viewport::Viewport;
use kurbo::Point;

/// Scene, viewport, selection and drawing settings for one session.
///
/// Every selection mutation goes through here so the selection never
/// references a deleted image.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub scene: Scene,
    pub viewport: Viewport,
    pub selection: Selection,
    pub drawing: DrawingSettings,
}

impl Canvas {
    /// Create an empty canvas.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            scene: Scene::new(),
            viewport: Viewport::from_config(config),
            selection: Selection::new(),
            drawing: DrawingSettings::default(),
        }
    }

    /// Select a single image, replacing the selection.
    pub fn select(&mut self, id: ImageId) {
        if self.scene.contains(id) {
            self.selection.select_only(id);
        }
    }

    /// Replace the selection, ignoring ids that are not on the board.
    pub fn select_many(&mut self, ids: impl IntoIterator<Item = ImageId>) {
        let scene = &self.scene;
        self.selection
            .replace(ids.into_iter().filter(|&id| scene.contains(id)));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: ImageId) -> bool {
        self.selection.contains(id)
    }

    /// Remove an image and purge it from the selection.
    pub fn delete_image(&mut self, id: ImageId) -> Option<BoardImage> {
        let removed = self.scene.delete_image(id);
        self.selection.remove(id);
        removed
    }

    /// Delete every selected image. Returns the removed images.
    pub fn delete_selected(&mut self) -> Vec<BoardImage> {
        let ids: Vec<ImageId> = self.selection.ids().to_vec();
        let removed = ids
            .into_iter()
            .filter_map(|id| self.scene.delete_image(id))
            .collect();
        self.clear_selection();
        removed
    }

    /// Hit test a screen point.
    pub fn pick(&self, screen_point: Point, config: &SessionConfig) -> PickResult {
        selection::pick(&self.scene, &self.selection, &self.viewport, config, screen_point)
    }

    /// Toolbar zoom in.
    pub fn zoom_in(&mut self, config: &SessionConfig) -> f64 {
        self.viewport.zoom_by(config.button_zoom_step)
    }

    /// Toolbar zoom out.
    pub fn zoom_out(&mut self, config: &SessionConfig) -> f64 {
        self.viewport.zoom_by(-config.button_zoom_step)
    }

    /// Back to 100%.
    pub fn reset_zoom(&mut self) -> f64 {
        self.viewport.reset_zoom();
        self.viewport.zoom()
    }

    /// Apply a wheel event. Only ctrl/meta wheel zooms; returns whether it did.
    pub fn apply_wheel(&mut self, wheel: &WheelEvent, config: &SessionConfig) -> bool {
        if !wheel.modifiers.command() || wheel.delta_y == 0.0 || !wheel.delta_y.is_finite() {
            return false;
        }
        let step = if wheel.delta_y > 0.0 {
            -config.wheel_zoom_step
        } else {
            config.wheel_zoom_step
        };
        match config.zoom_anchor {
            ZoomAnchor::Center => self.viewport.zoom_by(step),
            ZoomAnchor::Pointer => self.viewport.zoom_by_at(step, wheel.position),
        };
        true
    }

    /// Turn drawing mode on or off.
    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.drawing.enabled = enabled;
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.drawing.brush = brush;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSpec;
    use crate::input::Modifiers;
    use kurbo::Vec2;

    fn wheel(delta_y: f64, modifiers: Modifiers) -> WheelEvent {
        WheelEvent {
            position: Point::new(400.0, 300.0),
            delta_y,
            modifiers,
        }
    }

    #[test]
    fn test_delete_purges_selection() {
        let config = SessionConfig::default();
        let mut canvas = Canvas::new(&config);
        let a = canvas.scene.add_image(ImageSpec::new("a.png"));
        let b = canvas.scene.add_image(ImageSpec::new("b.png"));
        canvas.select(a.id);

        canvas.delete_image(b.id);
        assert!(canvas.is_selected(a.id));

        canvas.delete_image(a.id);
        assert!(canvas.selection.is_empty());
    }

    #[test]
    fn test_delete_selected() {
        let config = SessionConfig::default();
        let mut canvas = Canvas::new(&config);
        let a = canvas.scene.add_image(ImageSpec::new("a.png"));
        let b = canvas.scene.add_image(ImageSpec::new("b.png"));
        let c = canvas.scene.add_image(ImageSpec::new("c.png"));
        canvas.select_many([a.id, b.id]);

        let removed = canvas.delete_selected();
        assert_eq!(removed.len(), 2);
        assert!(canvas.selection.is_empty());
        assert!(canvas.scene.contains(c.id));
        assert_eq!(canvas.scene.len(), 1);
    }

    #[test]
    fn test_select_ignores_unknown() {
        let mut canvas = Canvas::new(&SessionConfig::default());
        canvas.select(uuid::Uuid::new_v4());
        assert!(canvas.selection.is_empty());
    }

    #[test]
    fn test_wheel_requires_command() {
        let config = SessionConfig::default();
        let mut canvas = Canvas::new(&config);
        assert!(!canvas.apply_wheel(&wheel(-1.0, Modifiers::NONE), &config));
        assert_eq!(canvas.viewport.zoom(), 1.0);

        assert!(canvas.apply_wheel(&wheel(-1.0, Modifiers::CTRL), &config));
        assert!((canvas.viewport.zoom() - 1.1).abs() < 1e-9);

        assert!(canvas.apply_wheel(&wheel(3.0, Modifiers::CTRL), &config));
        assert!((canvas.viewport.zoom() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_center_anchor_keeps_pan() {
        let config = SessionConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.viewport.offset = Vec2::new(25.0, 40.0);
        canvas.apply_wheel(&wheel(-1.0, Modifiers::CTRL), &config);
        assert_eq!(canvas.viewport.offset, Vec2::new(25.0, 40.0));
    }

    #[test]
    fn test_wheel_pointer_anchor() {
        let config = SessionConfig {
            zoom_anchor: ZoomAnchor::Pointer,
            ..SessionConfig::default()
        };
        let mut canvas = Canvas::new(&config);
        let event = wheel(-1.0, Modifiers::CTRL);
        let before = canvas.viewport.screen_to_world(event.position);
        canvas.apply_wheel(&event, &config);
        let after = canvas.viewport.screen_to_world(event.position);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_toolbar_zoom() {
        let config = SessionConfig::default();
        let mut canvas = Canvas::new(&config);
        assert_eq!(canvas.zoom_in(&config), 1.25);
        assert_eq!(canvas.zoom_out(&config), 1.0);
        assert_eq!(canvas.zoom_out(&config), 0.75);
        assert_eq!(canvas.zoom_out(&config), 0.5);
        assert_eq!(canvas.zoom_out(&config), 0.5);
        assert_eq!(canvas.reset_zoom(), 1.0);
    }
}
