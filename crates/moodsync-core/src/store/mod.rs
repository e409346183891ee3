//! Persistence collaborator: boards and images.

mod memory;

pub use memory::MemoryStore;

use crate::color::Rgba;
use crate::image::{BoardImage, ImageId, ImagePatch, ImageSpec};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a board.
pub type BoardId = Uuid;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Store error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A participant summary as stored on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub color: Rgba,
}

/// A mood board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    /// Milliseconds since the UNIX epoch.
    pub created_at_ms: u64,
    pub share_token: String,
    /// Actors currently on the board, in join order.
    pub participants: Vec<Participant>,
}

impl Board {
    /// Create a board with a fresh identity and share token.
    pub fn new(name: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.into(),
            created_at_ms: now_ms(),
            share_token: Uuid::new_v4().simple().to_string()[..6].to_string(),
            participants: Vec::new(),
        }
    }

    /// Link for inviting others, relative to `origin` (e.g. `https://moodsync.app`).
    pub fn share_url(&self, origin: &str) -> String {
        format!("{}/board/{}-{}", origin.trim_end_matches('/'), self.id, self.share_token)
    }

    /// Add or refresh a participant.
    pub fn join(&mut self, participant: Participant) {
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    /// Remove a participant. Returns whether it was present.
    pub fn leave(&mut self, actor_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != actor_id);
        self.participants.len() != before
    }
}

/// Milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    #[cfg(target_arch = "wasm32")]
    use web_time::{SystemTime, UNIX_EPOCH};
    #[cfg(not(target_arch = "wasm32"))]
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Trait for image persistence backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait ImageStore: Send + Sync {
    /// Create an image; the store assigns its identity.
    fn create_image(&self, spec: &ImageSpec) -> BoxFuture<'_, StoreResult<BoardImage>>;

    /// Merge a patch into a stored image and return the stored copy.
    fn update_image(&self, id: ImageId, patch: &ImagePatch) -> BoxFuture<'_, StoreResult<BoardImage>>;

    /// Delete an image. `Ok(false)` when it did not exist.
    fn delete_image(&self, id: ImageId) -> BoxFuture<'_, StoreResult<bool>>;

    /// All images of a board, in creation order.
    fn images_for_board(&self, board_id: BoardId) -> BoxFuture<'_, StoreResult<Vec<BoardImage>>>;
}

/// Trait for image persistence backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait ImageStore {
    fn create_image(&self, spec: &ImageSpec) -> BoxFuture<'_, StoreResult<BoardImage>>;
    fn update_image(&self, id: ImageId, patch: &ImagePatch) -> BoxFuture<'_, StoreResult<BoardImage>>;
    fn delete_image(&self, id: ImageId) -> BoxFuture<'_, StoreResult<bool>>;
    fn images_for_board(&self, board_id: BoardId) -> BoxFuture<'_, StoreResult<Vec<BoardImage>>>;
}

/// Trait for board persistence backends.
#[cfg(not(target_arch = "wasm32"))]
pub trait BoardStore: Send + Sync {
    /// Create a board. An empty name is a validation error.
    fn create_board(&self, name: &str) -> BoxFuture<'_, StoreResult<Board>>;

    fn get_board(&self, id: BoardId) -> BoxFuture<'_, StoreResult<Board>>;

    /// Add or refresh a participant; returns the updated board.
    fn join_board(&self, id: BoardId, participant: Participant) -> BoxFuture<'_, StoreResult<Board>>;

    /// Remove a participant; returns the updated board.
    fn leave_board(&self, id: BoardId, actor_id: &str) -> BoxFuture<'_, StoreResult<Board>>;
}

/// Trait for board persistence backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait BoardStore {
    fn create_board(&self, name: &str) -> BoxFuture<'_, StoreResult<Board>>;
    fn get_board(&self, id: BoardId) -> BoxFuture<'_, StoreResult<Board>>;
    fn join_board(&self, id: BoardId, participant: Participant) -> BoxFuture<'_, StoreResult<Board>>;
    fn leave_board(&self, id: BoardId, actor_id: &str) -> BoxFuture<'_, StoreResult<Board>>;
}
