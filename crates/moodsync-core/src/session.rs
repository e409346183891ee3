//! Board session: the single writer of a board's local state.
//!
//! Owns the canvas, the gesture machine, remote presence and the outbox of
//! persistence intents produced by optimistic edits.

use crate::canvas::Canvas;
use crate::color::Rgba;
use crate::config::SessionConfig;
use crate::error::{BoardError, BoardResult};
use crate::image::{self, BoardImage, ImageId, ImagePatch, ImageSpec};
use crate::input::{PointerEvent, WheelEvent};
use crate::interaction::{Effect, InteractionMachine};
use crate::palette::PaletteExtractor;
use crate::presence::{ActorId, Presence};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::{BoardId, ImageStore, Participant};
use kurbo::Point;
use std::collections::VecDeque;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// A queued persistence request for an optimistic local change.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Update {
        id: ImageId,
        patch: ImagePatch,
        /// The image before the patch, for rollback.
        previous: BoardImage,
    },
    Delete {
        image: BoardImage,
    },
}

impl Intent {
    pub fn image_id(&self) -> ImageId {
        match self {
            Intent::Update { id, .. } => *id,
            Intent::Delete { image } => image.id,
        }
    }
}

/// Outcome of a [`BoardSession::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub confirmed: usize,
    pub rolled_back: usize,
}

/// One actor's view of one board.
pub struct BoardSession {
    board_id: BoardId,
    actor: Participant,
    config: SessionConfig,
    canvas: Canvas,
    machine: InteractionMachine,
    presence: Presence,
    outbox: VecDeque<Intent>,
    last_cursor_broadcast: Option<Instant>,
    /// Pending outgoing presence messages.
    outgoing: Vec<ClientMessage>,
}

impl BoardSession {
    pub fn new(board_id: BoardId, actor: Participant, config: SessionConfig) -> Self {
        let presence = Presence::new(actor.id.clone(), &config);
        Self {
            board_id,
            canvas: Canvas::new(&config),
            machine: InteractionMachine::new(),
            presence,
            outbox: VecDeque::new(),
            last_cursor_broadcast: None,
            outgoing: vec![ClientMessage::Join {
                board: board_id,
                actor: actor.clone(),
            }],
            actor,
            config,
        }
    }

    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    pub fn actor(&self) -> &Participant {
        &self.actor
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn machine(&self) -> &InteractionMachine {
        &self.machine
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Intents not yet sent to the store, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Intent> {
        self.outbox.iter()
    }

    /// Take the presence messages queued since the last call.
    pub fn drain_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// Announce that the local actor is leaving.
    pub fn leave(&mut self) {
        self.machine.cancel(&mut self.canvas);
        self.outgoing.push(ClientMessage::Leave);
    }

    /// Replace the scene with the board's stored images.
    pub async fn load(&mut self, store: &dyn ImageStore) -> BoardResult<usize> {
        let images = store.images_for_board(self.board_id).await?;
        let count = images.len();
        self.machine.cancel(&mut self.canvas);
        self.canvas.scene = Default::default();
        for image in images {
            self.canvas.scene.insert_image(image);
        }
        self.canvas.selection.retain_existing(&self.canvas.scene);
        self.outbox.clear();
        log::info!("Loaded {count} image(s) for board {}", self.board_id);
        Ok(count)
    }

    // --- Input ---

    /// Feed a pointer event through the gesture machine.
    pub fn handle_pointer(&mut self, event: &PointerEvent, now: Instant) -> Vec<Effect> {
        let effects = self.machine.handle(&mut self.canvas, &self.config, event);
        for effect in &effects {
            match effect {
                Effect::ImageUpdated { id, patch, previous } => self.outbox.push_back(Intent::Update {
                    id: *id,
                    patch: patch.clone(),
                    previous: previous.clone(),
                }),
                Effect::Cursor(position) => self.broadcast_cursor(*position, now),
                _ => {}
            }
        }
        effects
    }

    /// Ctrl/meta wheel zoom. Returns whether the event was consumed as a zoom.
    pub fn handle_wheel(&mut self, wheel: &WheelEvent) -> bool {
        self.canvas.apply_wheel(wheel, &self.config)
    }

    /// End the active gesture without committing it.
    pub fn cancel_gesture(&mut self) -> Vec<Effect> {
        self.machine.cancel(&mut self.canvas)
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.canvas.zoom_in(&self.config)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.canvas.zoom_out(&self.config)
    }

    pub fn reset_zoom(&mut self) -> f64 {
        self.canvas.reset_zoom()
    }

    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.canvas.set_drawing_enabled(enabled);
    }

    pub fn set_brush(&mut self, brush: crate::drawing::Brush) {
        self.canvas.set_brush(brush);
    }

    /// Queue a cursor broadcast unless one went out within the throttle window.
    fn broadcast_cursor(&mut self, position: Point, now: Instant) {
        let due = self
            .last_cursor_broadcast
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cursor_throttle());
        if due {
            self.last_cursor_broadcast = Some(now);
            self.outgoing.push(ClientMessage::cursor(position));
        }
    }

    // --- Presence ---

    /// Apply a message from the presence relay.
    pub fn apply_remote(&mut self, message: &ServerMessage, now: Instant) {
        message.apply(&mut self.presence, now);
    }

    /// Periodic housekeeping; returns actors dropped for inactivity.
    pub fn tick(&mut self, now: Instant) -> Vec<ActorId> {
        self.presence.maybe_sweep(now)
    }

    // --- Image operations ---

    /// Validate, persist and place a new image, then fetch its palette.
    ///
    /// Creation is not optimistic: the store assigns the identity. A failed
    /// palette extraction leaves the image without colors.
    pub async fn add_image(
        &mut self,
        mut spec: ImageSpec,
        store: &dyn ImageStore,
        extractor: &dyn PaletteExtractor,
    ) -> BoardResult<BoardImage> {
        spec.url = spec.url.trim().to_string();
        if !image::is_valid_image_url(&spec.url) {
            return Err(BoardError::InvalidImageUrl(spec.url));
        }
        if !spec.is_finite() {
            return Err(BoardError::Validation(format!(
                "non-finite geometry for image {}",
                spec.url
            )));
        }
        spec.board_id = self.board_id;
        if spec.uploaded_by.is_empty() {
            spec.uploaded_by = self.actor.id.clone();
        }

        let created = store.create_image(&spec).await?;
        log::info!("Image {} created on board {}", created.id, self.board_id);
        self.canvas.scene.insert_image(created.clone());

        if created.colors.is_empty() {
            match extractor.extract(&created.url).await {
                Ok(colors) if !colors.is_empty() => self.set_colors(created.id, colors)?,
                Ok(_) => {}
                Err(err) => log::warn!("Palette extraction failed for {}: {err}", created.id),
            }
        }
        self.canvas
            .scene
            .get_image(created.id)
            .cloned()
            .ok_or(BoardError::NotFound(created.id))
    }

    /// Re-run palette extraction for an image.
    pub async fn refresh_palette(&mut self, id: ImageId, extractor: &dyn PaletteExtractor) -> BoardResult<Vec<Rgba>> {
        let url = self
            .canvas
            .scene
            .get_image(id)
            .map(|image| image.url.clone())
            .ok_or(BoardError::NotFound(id))?;
        let colors = extractor.extract(&url).await?;
        self.set_colors(id, colors.clone())?;
        Ok(colors)
    }

    fn set_colors(&mut self, id: ImageId, colors: Vec<Rgba>) -> BoardResult<()> {
        self.update_image(id, ImagePatch::colors(colors))
    }

    /// Apply a local edit optimistically and queue it.
    pub fn update_image(&mut self, id: ImageId, patch: ImagePatch) -> BoardResult<()> {
        let previous = self.canvas.scene.update_image(id, &patch)?;
        self.outbox.push_back(Intent::Update { id, patch, previous });
        Ok(())
    }

    /// Move an image above every other image.
    pub fn bring_to_front(&mut self, id: ImageId) -> BoardResult<()> {
        let (patch, previous) = self.canvas.scene.bring_to_front(id)?;
        self.outbox.push_back(Intent::Update { id, patch, previous });
        Ok(())
    }

    /// Delete one image. Returns false when it does not exist.
    pub fn delete_image(&mut self, id: ImageId) -> bool {
        match self.canvas.delete_image(id) {
            Some(image) => {
                self.outbox.push_back(Intent::Delete { image });
                true
            }
            None => false,
        }
    }

    /// Delete every selected image. Returns the deleted ids.
    pub fn delete_selected(&mut self) -> Vec<ImageId> {
        let removed = self.canvas.delete_selected();
        let ids = removed.iter().map(|image| image.id).collect();
        self.outbox
            .extend(removed.into_iter().map(|image| Intent::Delete { image }));
        ids
    }

    /// Merge an image changed by another actor, unless a local write is pending.
    pub fn apply_remote_image(&mut self, image: BoardImage) {
        if image.board_id != self.board_id || self.has_pending(image.id) {
            return;
        }
        self.canvas.scene.insert_image(image);
    }

    /// Drop an image deleted by another actor.
    pub fn apply_remote_delete(&mut self, id: ImageId) {
        self.outbox.retain(|intent| intent.image_id() != id);
        self.canvas.delete_image(id);
    }

    fn has_pending(&self, id: ImageId) -> bool {
        self.outbox.iter().any(|intent| intent.image_id() == id)
    }

    // --- Persistence ---

    /// Send pending intents to the store in FIFO order.
    ///
    /// A confirmed update adopts the store's copy unless a later local write
    /// to the same image is still queued. A failed one is rolled back field
    /// by field; a failed delete puts the image back.
    pub async fn flush(&mut self, store: &dyn ImageStore) -> FlushReport {
        let mut report = FlushReport::default();

        while let Some(intent) = self.outbox.pop_front() {
            match intent {
                Intent::Update { id, patch, previous } => match store.update_image(id, &patch).await {
                    Ok(stored) => {
                        report.confirmed += 1;
                        if !self.has_pending(id) && self.canvas.scene.contains(id) {
                            self.canvas.scene.insert_image(stored);
                        }
                    }
                    Err(err) => {
                        report.rolled_back += 1;
                        log::warn!("Update of image {id} failed, rolling back: {err}");
                        // Later snapshots were taken on top of the failed write.
                        for later in self.outbox.iter_mut().filter(|intent| intent.image_id() == id) {
                            match later {
                                Intent::Update { previous: snapshot, .. } => snapshot.revert(&patch, &previous),
                                Intent::Delete { image } => image.revert(&patch, &previous),
                            }
                        }
                        self.canvas.scene.revert_image(id, &patch, &previous);
                    }
                },
                Intent::Delete { image } => match store.delete_image(image.id).await {
                    Ok(existed) => {
                        report.confirmed += 1;
                        if !existed {
                            log::debug!("Image {} was already gone from the store", image.id);
                        }
                    }
                    Err(err) => {
                        report.rolled_back += 1;
                        log::warn!("Delete of image {} failed, restoring it: {err}", image.id);
                        self.canvas.scene.insert_image(image);
                    }
                },
            }
        }

        if report.confirmed + report.rolled_back > 0 {
            log::info!(
                "Flushed board {}: {} confirmed, {} rolled back",
                self.board_id,
                report.confirmed,
                report.rolled_back
            );
        }
        report
    }
}
