//! MoodSync Core Library
//!
//! Platform-agnostic canvas interaction and collaborative state for the
//! MoodSync mood board: viewport transforms, the image scene, gesture
//! handling, freehand strokes, remote presence and the persistence outbox.

pub mod canvas;
pub mod color;
pub mod config;
pub mod drawing;
pub mod error;
pub mod geometry;
pub mod image;
pub mod input;
pub mod interaction;
pub mod palette;
pub mod presence;
pub mod protocol;
pub mod scene;
pub mod selection;
pub mod session;
pub mod store;
pub mod viewport;

pub use canvas::Canvas;
pub use color::Rgba;
pub use config::{SessionConfig, ZoomAnchor};
pub use drawing::{Brush, DrawTool, Stroke, StrokeStyle};
pub use error::{BoardError, BoardResult};
pub use self::image::{BoardImage, ImageId, ImagePatch, ImageSpec, MIN_IMAGE_SIZE};
pub use input::{Modifiers, MouseButton, PointerEvent, WheelEvent};
pub use interaction::{Effect, GestureKind, InteractionMachine};
pub use palette::{FixedPaletteExtractor, PaletteExtractor, PixelPaletteExtractor};
pub use presence::{ActorId, CursorUpdate, Presence, RemoteActor};
pub use scene::Scene;
pub use selection::{Corner, HandleKind, PickKind, PickResult, Selection};
pub use session::BoardSession;
pub use store::{Board, BoardId, BoardStore, ImageStore, MemoryStore, Participant, StoreError};
pub use viewport::Viewport;
