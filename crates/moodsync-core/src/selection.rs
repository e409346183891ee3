//! Selection set, manipulation handles and hit testing.

use crate::config::SessionConfig;
use crate::geometry;
use crate::image::{BoardImage, ImageId, MIN_IMAGE_SIZE};
use crate::scene::Scene;
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Session-local set of selected images, kept in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<ImageId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with a single image.
    pub fn select_only(&mut self, id: ImageId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Replace the selection with `ids`, dropping duplicates.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ImageId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Remove one image. Returns whether it was selected.
    pub fn remove(&mut self, id: ImageId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&selected| selected != id);
        self.ids.len() != before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.ids.contains(&id)
    }

    /// Drop ids that no longer exist in `scene`.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.ids.retain(|&id| scene.contains(id));
    }

    pub fn ids(&self) -> &[ImageId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// World position of this corner on an unrotated rectangle.
    pub fn point_of(self, position: Point, size: Size) -> Point {
        match self {
            Corner::TopLeft => position,
            Corner::TopRight => Point::new(position.x + size.width, position.y),
            Corner::BottomLeft => Point::new(position.x, position.y + size.height),
            Corner::BottomRight => Point::new(position.x + size.width, position.y + size.height),
        }
    }

    fn moves_left_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Corner(Corner),
    /// Rotation handle above the top edge.
    Rotate,
}

/// A handle with its world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    /// Check if a world point hits this handle. `tolerance` is in world units.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        geometry::distance(point, self.position) <= tolerance
    }
}

/// Corner and rotate handles for an image, in world coordinates.
///
/// The rotate handle sits a fixed screen distance above the top-center, so
/// its world offset shrinks as zoom grows. All handles follow the image's
/// rotation about its center.
pub fn image_handles(image: &BoardImage, zoom: f64, config: &SessionConfig) -> Vec<Handle> {
    let center = image.center();
    let bounds = image.bounds();
    let rotated = |p: Point| geometry::rotate_about(p, center, image.rotation);

    let mut handles: Vec<Handle> = Corner::ALL
        .iter()
        .map(|&corner| Handle {
            position: rotated(corner.point_of(image.position, image.size)),
            kind: HandleKind::Corner(corner),
        })
        .collect();
    let offset = config.rotate_handle_offset_px / zoom;
    handles.push(Handle {
        position: rotated(Point::new(center.x, bounds.y0 - offset)),
        kind: HandleKind::Rotate,
    });
    handles
}

/// What lies under a screen point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickKind {
    Body,
    Handle(Corner),
    Rotate,
    Empty,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickResult {
    pub kind: PickKind,
    /// The image hit; `None` exactly when `kind` is `Empty`.
    pub image: Option<ImageId>,
}

impl PickResult {
    pub const EMPTY: Self = Self {
        kind: PickKind::Empty,
        image: None,
    };
}

/// Hit test a screen point against the scene.
///
/// Handles win over bodies. Images are tested front to back; an image's
/// handles are only live while it is selected or under the pointer.
pub fn pick(
    scene: &Scene,
    selection: &Selection,
    viewport: &Viewport,
    config: &SessionConfig,
    screen_point: Point,
) -> PickResult {
    let world = viewport.screen_to_world(screen_point);
    let tolerance = viewport.screen_len_to_world(config.handle_tolerance_px);
    let front_to_back: Vec<&BoardImage> = scene.images_ordered().into_iter().rev().collect();

    for image in &front_to_back {
        if !(selection.contains(image.id) || image.contains(world)) {
            continue;
        }
        let handles = image_handles(image, viewport.zoom(), config);
        if let Some(handle) = handles.iter().find(|h| h.hit_test(world, tolerance)) {
            let kind = match handle.kind {
                HandleKind::Corner(corner) => PickKind::Handle(corner),
                HandleKind::Rotate => PickKind::Rotate,
            };
            return PickResult {
                kind,
                image: Some(image.id),
            };
        }
    }

    front_to_back
        .iter()
        .find(|image| image.contains(world))
        .map(|image| PickResult {
            kind: PickKind::Body,
            image: Some(image.id),
        })
        .unwrap_or(PickResult::EMPTY)
}

/// New position and size after dragging `corner` by `delta` world units.
///
/// The opposite corner stays put; each dimension is floored at
/// [`MIN_IMAGE_SIZE`], and a floored edge stops against the fixed corner.
pub fn resize_from_corner(start_position: Point, start_size: Size, corner: Corner, delta: Vec2) -> (Point, Size) {
    let dx = if corner.moves_left_edge() { -delta.x } else { delta.x };
    let dy = if corner.moves_top_edge() { -delta.y } else { delta.y };
    let size = Size::new(
        (start_size.width + dx).max(MIN_IMAGE_SIZE),
        (start_size.height + dy).max(MIN_IMAGE_SIZE),
    );

    let mut position = start_position;
    if corner.moves_left_edge() {
        position.x = start_position.x + (start_size.width - size.width);
    }
    if corner.moves_top_edge() {
        position.y = start_position.y + (start_size.height - size.height);
    }
    (position, size)
}

/// Rotation after dragging the rotate handle from `start_pointer` to `pointer`.
///
/// Angles are measured in screen space around `center`.
pub fn rotation_from_drag(start_rotation: f64, center: Point, start_pointer: Point, pointer: Point) -> f64 {
    let start_angle = geometry::angle_degrees(center, start_pointer);
    let angle = geometry::angle_degrees(center, pointer);
    start_rotation + (angle - start_angle)
}
