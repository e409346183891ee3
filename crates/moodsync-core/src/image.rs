//! Board images: the items placed on the canvas.

use crate::color::Rgba;
use crate::geometry;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an image.
pub type ImageId = Uuid;

/// Minimum width and height of an image in world units.
pub const MIN_IMAGE_SIZE: f64 = 50.0;

/// Position used when an `ImageSpec` leaves it unset.
pub const DEFAULT_POSITION: Point = Point::new(100.0, 100.0);

/// Size used when an `ImageSpec` leaves it unset.
pub const DEFAULT_SIZE: Size = Size::new(280.0, 200.0);

/// Z-order given to freshly created images.
pub const DEFAULT_Z_INDEX: i64 = 1;

/// Image extensions and host hints accepted by [`is_valid_image_url`].
const IMAGE_URL_HINTS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", "unsplash", "images",
];

/// Check whether a URL plausibly points at an image.
pub fn is_valid_image_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    let lower = url.to_lowercase();
    lower.starts_with("data:image/")
        || lower.starts_with("blob:")
        || IMAGE_URL_HINTS.iter().any(|hint| lower.contains(hint))
}

/// An image on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardImage {
    pub id: ImageId,
    /// Source reference (URL, data URL or blob handle).
    pub url: String,
    /// Top-left corner in world coordinates.
    pub position: Point,
    /// Size in world units, never below [`MIN_IMAGE_SIZE`].
    pub size: Size,
    /// Rotation in degrees about the image center. Unbounded.
    pub rotation: f64,
    /// Stacking order; higher is in front.
    pub z_index: i64,
    /// Id of the uploading actor.
    pub uploaded_by: String,
    /// Board the image belongs to.
    pub board_id: Uuid,
    /// Representative colors, empty until extraction completes.
    #[serde(default)]
    pub colors: Vec<Rgba>,
}

impl BoardImage {
    /// Build an image from a creation spec, filling defaults.
    pub fn from_spec(id: ImageId, spec: ImageSpec) -> Self {
        let size = spec.size.unwrap_or(DEFAULT_SIZE);
        Self {
            id,
            url: spec.url,
            position: spec.position.unwrap_or(DEFAULT_POSITION),
            size: Size::new(
                size.width.max(MIN_IMAGE_SIZE),
                size.height.max(MIN_IMAGE_SIZE),
            ),
            rotation: spec.rotation.unwrap_or(0.0),
            z_index: spec.z_index.unwrap_or(DEFAULT_Z_INDEX),
            uploaded_by: spec.uploaded_by,
            board_id: spec.board_id,
            colors: spec.colors.unwrap_or_default(),
        }
    }

    /// Axis-aligned bounds in world space (rotation ignored).
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Center in world space.
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Whether a world point lies inside the rotated image.
    pub fn contains(&self, point: Point) -> bool {
        let local = geometry::rotate_about(point, self.center(), -self.rotation);
        self.bounds().contains(local)
    }

    /// Merge a patch into this image.
    ///
    /// Sizes are floored at [`MIN_IMAGE_SIZE`].
    pub fn apply(&mut self, patch: &ImagePatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = Size::new(size.width.max(MIN_IMAGE_SIZE), size.height.max(MIN_IMAGE_SIZE));
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(colors) = &patch.colors {
            self.colors = colors.clone();
        }
    }

    /// Undo the fields `patch` set, restoring them from `previous`.
    ///
    /// A field is only restored while it still holds the patched value, so a
    /// later write to the same field wins over the rollback.
    pub fn revert(&mut self, patch: &ImagePatch, previous: &BoardImage) {
        if patch.position.is_some() && patch.position == Some(self.position) {
            self.position = previous.position;
        }
        if let Some(size) = patch.size {
            let floored = Size::new(size.width.max(MIN_IMAGE_SIZE), size.height.max(MIN_IMAGE_SIZE));
            if floored == self.size {
                self.size = previous.size;
            }
        }
        if patch.rotation.is_some() && patch.rotation == Some(self.rotation) {
            self.rotation = previous.rotation;
        }
        if patch.z_index.is_some() && patch.z_index == Some(self.z_index) {
            self.z_index = previous.z_index;
        }
        if patch.colors.as_ref() == Some(&self.colors) {
            self.colors = previous.colors.clone();
        }
    }
}

/// Input for creating an image. Missing fields take the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub url: String,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub z_index: Option<i64>,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default)]
    pub board_id: Uuid,
    #[serde(default)]
    pub colors: Option<Vec<Rgba>>,
}

impl ImageSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn uploaded_by(mut self, actor: impl Into<String>) -> Self {
        self.uploaded_by = actor.into();
        self
    }

    pub fn on_board(mut self, board_id: Uuid) -> Self {
        self.board_id = board_id;
        self
    }

    /// Whether every provided geometry field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position.is_none_or(geometry::is_finite_point)
            && self
                .size
                .is_none_or(|s| s.width.is_finite() && s.height.is_finite())
            && self.rotation.is_none_or(f64::is_finite)
    }
}

/// Partial update of an image. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<Rgba>>,
}

impl ImagePatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn z_index(z_index: i64) -> Self {
        Self {
            z_index: Some(z_index),
            ..Self::default()
        }
    }

    pub fn colors(colors: Vec<Rgba>) -> Self {
        Self {
            colors: Some(colors),
            ..Self::default()
        }
    }

    pub fn resize(position: Point, size: Size) -> Self {
        Self {
            position: Some(position),
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.size.is_none()
            && self.rotation.is_none()
            && self.z_index.is_none()
            && self.colors.is_none()
    }

    /// Whether every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_none_or(geometry::is_finite_point)
            && self
                .size
                .is_none_or(|s| s.width.is_finite() && s.height.is_finite())
            && self.rotation.is_none_or(f64::is_finite)
    }
}
