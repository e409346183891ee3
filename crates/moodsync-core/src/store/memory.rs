//! In-memory store implementation.

use super::{Board, BoardId, BoardStore, BoxFuture, ImageStore, Participant, StoreError, StoreResult};
use crate::image::{BoardImage, ImageId, ImagePatch, ImageSpec};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct ImageTable {
    images: HashMap<ImageId, BoardImage>,
    /// Creation order.
    order: Vec<ImageId>,
}

/// In-memory store for tests, the replay tool and ephemeral boards.
#[derive(Debug, Default)]
pub struct MemoryStore {
    boards: RwLock<HashMap<BoardId, Board>>,
    images: RwLock<ImageTable>,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored images across all boards.
    pub fn image_count(&self) -> usize {
        read(&self.images).map(|table| table.images.len()).unwrap_or(0)
    }
}

impl ImageStore for MemoryStore {
    fn create_image(&self, spec: &ImageSpec) -> BoxFuture<'_, StoreResult<BoardImage>> {
        let spec = spec.clone();
        Box::pin(async move {
            if spec.url.trim().is_empty() {
                return Err(StoreError::Validation("image url is empty".into()));
            }
            if !spec.is_finite() {
                return Err(StoreError::Validation("non-finite image geometry".into()));
            }
            let image = BoardImage::from_spec(Uuid::new_v4(), spec);
            let mut table = write(&self.images)?;
            table.order.push(image.id);
            table.images.insert(image.id, image.clone());
            Ok(image)
        })
    }

    fn update_image(&self, id: ImageId, patch: &ImagePatch) -> BoxFuture<'_, StoreResult<BoardImage>> {
        let patch = patch.clone();
        Box::pin(async move {
            if !patch.is_finite() {
                return Err(StoreError::Validation(format!("non-finite geometry for image {id}")));
            }
            let mut table = write(&self.images)?;
            let image = table
                .images
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            image.apply(&patch);
            Ok(image.clone())
        })
    }

    fn delete_image(&self, id: ImageId) -> BoxFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            let mut table = write(&self.images)?;
            table.order.retain(|&image_id| image_id != id);
            Ok(table.images.remove(&id).is_some())
        })
    }

    fn images_for_board(&self, board_id: BoardId) -> BoxFuture<'_, StoreResult<Vec<BoardImage>>> {
        Box::pin(async move {
            let table = read(&self.images)?;
            Ok(table
                .order
                .iter()
                .filter_map(|id| table.images.get(id))
                .filter(|image| image.board_id == board_id)
                .cloned()
                .collect())
        })
    }
}

impl BoardStore for MemoryStore {
    fn create_board(&self, name: &str) -> BoxFuture<'_, StoreResult<Board>> {
        let name = name.trim().to_string();
        Box::pin(async move {
            if name.is_empty() {
                return Err(StoreError::Validation("board name is empty".into()));
            }
            let board = Board::new(name);
            write(&self.boards)?.insert(board.id, board.clone());
            log::info!("Created board {} ({})", board.name, board.id);
            Ok(board)
        })
    }

    fn get_board(&self, id: BoardId) -> BoxFuture<'_, StoreResult<Board>> {
        Box::pin(async move {
            read(&self.boards)?
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        })
    }

    fn join_board(&self, id: BoardId, participant: Participant) -> BoxFuture<'_, StoreResult<Board>> {
        Box::pin(async move {
            let mut boards = write(&self.boards)?;
            let board = boards
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            board.join(participant);
            Ok(board.clone())
        })
    }

    fn leave_board(&self, id: BoardId, actor_id: &str) -> BoxFuture<'_, StoreResult<Board>> {
        let actor_id = actor_id.to_string();
        Box::pin(async move {
            let mut boards = write(&self.boards)?;
            let board = boards
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            board.leave(&actor_id);
            Ok(board.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use kurbo::{Point, Size};
    use pollster::block_on;

    #[test]
    fn test_create_and_list_images() {
        let store = MemoryStore::new();
        let board = Uuid::new_v4();
        let other = Uuid::new_v4();

        let a = block_on(store.create_image(&ImageSpec::new("a.png").on_board(board))).unwrap();
        block_on(store.create_image(&ImageSpec::new("b.png").on_board(other))).unwrap();
        let c = block_on(store.create_image(&ImageSpec::new("c.png").on_board(board))).unwrap();

        let ids: Vec<ImageId> = block_on(store.images_for_board(board))
            .unwrap()
            .iter()
            .map(|image| image.id)
            .collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert_eq!(a.size, Size::new(280.0, 200.0));
    }

    #[test]
    fn test_update_image() {
        let store = MemoryStore::new();
        let image = block_on(store.create_image(&ImageSpec::new("a.png"))).unwrap();
        let updated = block_on(store.update_image(image.id, &ImagePatch::position(Point::new(1.0, 2.0)))).unwrap();
        assert_eq!(updated.position, Point::new(1.0, 2.0));

        let missing = block_on(store.update_image(Uuid::new_v4(), &ImagePatch::rotation(1.0)));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_image_reports_presence() {
        let store = MemoryStore::new();
        let image = block_on(store.create_image(&ImageSpec::new("a.png"))).unwrap();
        assert!(block_on(store.delete_image(image.id)).unwrap());
        assert!(!block_on(store.delete_image(image.id)).unwrap());
        assert_eq!(store.image_count(), 0);
    }

    #[test]
    fn test_empty_url_rejected() {
        let store = MemoryStore::new();
        let result = block_on(store.create_image(&ImageSpec::new("  ")));
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_non_finite_spec_rejected() {
        let store = MemoryStore::new();
        let spec = ImageSpec::new("a.png").at(Point::new(f64::NAN, 0.0));
        let result = block_on(store.create_image(&spec));
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.image_count(), 0);
    }

    #[test]
    fn test_board_lifecycle() {
        let store = MemoryStore::new();
        assert!(matches!(
            block_on(store.create_board("   ")),
            Err(StoreError::Validation(_))
        ));

        let board = block_on(store.create_board("Autumn palette")).unwrap();
        let participant = Participant {
            id: "u1".into(),
            name: "Ada".into(),
            color: Rgba::rgb(0xFF, 0x6B, 0x6B),
        };
        let joined = block_on(store.join_board(board.id, participant)).unwrap();
        assert_eq!(joined.participants.len(), 1);

        let left = block_on(store.leave_board(board.id, "u1")).unwrap();
        assert!(left.participants.is_empty());

        let fetched = block_on(store.get_board(board.id)).unwrap();
        assert_eq!(fetched.name, "Autumn palette");
        assert!(matches!(
            block_on(store.get_board(Uuid::new_v4())),
            Err(StoreError::NotFound(_))
        ));
    }
}
