//! Scene model: the board's images and completed strokes.

use crate::color::Rgba;
use crate::drawing::Stroke;
use crate::error::{BoardError, BoardResult};
use crate::geometry;
use crate::image::{BoardImage, ImageId, ImagePatch, ImageSpec};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// The board's image set and stroke overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    /// All images, keyed by ID.
    images: HashMap<ImageId, BoardImage>,
    /// Insertion order, used to break z-order ties.
    order: Vec<ImageId>,
    /// Completed strokes, oldest first.
    strokes: Vec<Stroke>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an image from an `ImageSpec`, assigning a fresh identity.
    pub fn add_image(&mut self, spec: ImageSpec) -> BoardImage {
        let image = BoardImage::from_spec(Uuid::new_v4(), spec);
        self.insert_image(image.clone());
        image
    }

    /// Insert or replace an image (e.g. one confirmed by the store).
    pub fn insert_image(&mut self, image: BoardImage) {
        let id = image.id;
        if self.images.insert(id, image).is_none() {
            self.order.push(id);
        }
    }

    /// Merge `patch` into the image. Returns the image as it was before.
    pub fn update_image(&mut self, id: ImageId, patch: &ImagePatch) -> BoardResult<BoardImage> {
        if !patch.is_finite() {
            return Err(BoardError::Validation(format!(
                "non-finite geometry in update for image {id}"
            )));
        }
        let image = self.images.get_mut(&id).ok_or(BoardError::NotFound(id))?;
        let previous = image.clone();
        image.apply(patch);
        Ok(previous)
    }

    /// Roll back the fields `patch` set. Returns false if the image is gone.
    pub fn revert_image(&mut self, id: ImageId, patch: &ImagePatch, previous: &BoardImage) -> bool {
        match self.images.get_mut(&id) {
            Some(image) => {
                image.revert(patch, previous);
                true
            }
            None => false,
        }
    }

    /// Remove an image.
    pub fn delete_image(&mut self, id: ImageId) -> Option<BoardImage> {
        self.order.retain(|&image_id| image_id != id);
        self.images.remove(&id)
    }

    /// Give the image a z-order above every other image.
    ///
    /// Returns the patch applied and the previous image.
    pub fn bring_to_front(&mut self, id: ImageId) -> BoardResult<(ImagePatch, BoardImage)> {
        if !self.images.contains_key(&id) {
            return Err(BoardError::NotFound(id));
        }
        let top = self.images.values().map(|image| image.z_index).max().unwrap_or(0);
        let patch = ImagePatch::z_index(top.saturating_add(1));
        let previous = self.update_image(id, &patch)?;
        Ok((patch, previous))
    }

    pub fn get_image(&self, id: ImageId) -> Option<&BoardImage> {
        self.images.get(&id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.images.contains_key(&id)
    }

    /// Images back to front: by z-order, then insertion order.
    pub fn images_ordered(&self) -> Vec<&BoardImage> {
        let mut ordered: Vec<(usize, &BoardImage)> = self
            .order
            .iter()
            .enumerate()
            .filter_map(|(seq, id)| self.images.get(id).map(|image| (seq, image)))
            .collect();
        ordered.sort_by_key(|(seq, image)| (image.z_index, *seq));
        ordered.into_iter().map(|(_, image)| image).collect()
    }

    /// Images whose bounds strictly intersect `rect` (world space), back to front.
    pub fn images_in_rect(&self, rect: Rect) -> Vec<ImageId> {
        self.images_ordered()
            .into_iter()
            .filter(|image| geometry::rects_intersect(image.bounds(), rect))
            .map(|image| image.id)
            .collect()
    }

    /// Every palette color across images, in image order, without duplicates.
    pub fn board_palette(&self) -> Vec<Rgba> {
        let mut seen = HashSet::new();
        self.order
            .iter()
            .filter_map(|id| self.images.get(id))
            .flat_map(|image| image.colors.iter().copied())
            .filter(|color| seen.insert(*color))
            .collect()
    }

    /// Append a finalized stroke.
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a scene from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
