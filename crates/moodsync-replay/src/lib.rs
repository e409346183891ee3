//! Headless replay of board sessions.
//!
//! A script names a board, the local actor and a list of steps (image adds,
//! pointer and wheel events, remote presence messages, flushes). The runner
//! plays them against an in-memory store and reports the final board state.

use kurbo::{Point, Rect, Vec2};
use moodsync_core::palette::FixedPaletteExtractor;
use moodsync_core::protocol::{ClientMessage, ServerMessage};
use moodsync_core::store::{BoardStore, ImageStore, StoreError};
use moodsync_core::{
    Board, BoardError, BoardImage, BoardSession, Brush, DrawTool, ImageId, ImageSpec, MemoryStore, Participant,
    PointerEvent, Rgba, SessionConfig, Stroke, StrokeStyle, WheelEvent,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Cannot read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Step {step}: no image #{index}")]
    UnknownImage { step: usize, index: usize },
}

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: SessionConfig,
    pub board: String,
    pub actor: Participant,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let script: Self = serde_json::from_str(json)?;
        script.config.validate().map_err(BoardError::from)?;
        Ok(script)
    }
}

/// One scripted action. `at_ms` is the offset from the start of the replay;
/// steps without it happen at the previous step's time.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    AddImage {
        spec: ImageSpec,
    },
    Pointer {
        event: PointerEvent,
        at_ms: Option<u64>,
    },
    Wheel {
        event: WheelEvent,
    },
    Remote {
        message: ServerMessage,
        at_ms: Option<u64>,
    },
    Drawing {
        enabled: bool,
        #[serde(default)]
        tool: Option<DrawTool>,
        #[serde(default)]
        style: Option<StrokeStyle>,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        color: Option<Rgba>,
    },
    /// `image` indexes images in the order the script added them.
    BringToFront {
        image: usize,
    },
    DeleteSelected,
    Cancel,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Flush,
    Tick {
        at_ms: u64,
    },
}

/// A remote cursor in the final state.
#[derive(Debug, Clone, Serialize)]
pub struct CursorReport {
    pub actor_id: String,
    pub name: String,
    pub color: Rgba,
    pub position: Point,
}

/// Final state of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub board: Board,
    /// Back to front.
    pub images: Vec<BoardImage>,
    pub strokes: Vec<Stroke>,
    pub selection: Vec<ImageId>,
    pub zoom: f64,
    pub offset: Vec2,
    pub palette: Vec<Rgba>,
    pub cursors: Vec<CursorReport>,
    pub outgoing: Vec<ClientMessage>,
    pub rolled_back: usize,
    /// Rubber band of an unfinished rect selection (screen space).
    pub selection_rect: Option<Rect>,
    /// Stroke of an unfinished drawing gesture.
    pub active_stroke: Option<Stroke>,
}

/// Play a script against a fresh in-memory store.
pub async fn run(script: Script) -> Result<ReplayReport, ReplayError> {
    let store = MemoryStore::new();
    let extractor = FixedPaletteExtractor;
    let board = store.create_board(&script.board).await?;
    store.join_board(board.id, script.actor.clone()).await?;

    let mut session = BoardSession::new(board.id, script.actor.clone(), script.config.clone());
    let start = Instant::now();
    let mut now = start;
    let mut added: Vec<ImageId> = Vec::new();
    let mut outgoing = Vec::new();
    let mut rolled_back = 0;

    for (index, step) in script.steps.into_iter().enumerate() {
        log::debug!("Step {index}: {step:?}");
        match step {
            Step::AddImage { spec } => {
                let image = session.add_image(spec, &store, &extractor).await?;
                added.push(image.id);
            }
            Step::Pointer { event, at_ms } => {
                if let Some(ms) = at_ms {
                    now = start + Duration::from_millis(ms);
                }
                session.handle_pointer(&event, now);
            }
            Step::Wheel { event } => {
                session.handle_wheel(&event);
            }
            Step::Remote { message, at_ms } => {
                if let Some(ms) = at_ms {
                    now = start + Duration::from_millis(ms);
                }
                session.apply_remote(&message, now);
            }
            Step::Drawing {
                enabled,
                tool,
                style,
                width,
                color,
            } => {
                let mut brush = tool.map(Brush::for_tool).unwrap_or_else(|| session.canvas().drawing.brush.clone());
                if let Some(style) = style {
                    brush = brush.with_style(style);
                }
                if let Some(width) = width {
                    brush = brush.with_width(width);
                }
                if let Some(color) = color {
                    brush = brush.with_color(color);
                }
                session.set_brush(brush);
                session.set_drawing_enabled(enabled);
            }
            Step::BringToFront { image } => {
                let id = *added
                    .get(image)
                    .ok_or(ReplayError::UnknownImage { step: index, index: image })?;
                session.bring_to_front(id)?;
            }
            Step::DeleteSelected => {
                session.delete_selected();
            }
            Step::Cancel => {
                session.cancel_gesture();
            }
            Step::ZoomIn => {
                session.zoom_in();
            }
            Step::ZoomOut => {
                session.zoom_out();
            }
            Step::ResetZoom => {
                session.reset_zoom();
            }
            Step::Flush => {
                rolled_back += session.flush(&store).await.rolled_back;
            }
            Step::Tick { at_ms } => {
                now = start + Duration::from_millis(at_ms);
                session.tick(now);
            }
        }
        outgoing.extend(session.drain_outgoing());
    }

    rolled_back += session.flush(&store).await.rolled_back;
    let board = store.get_board(board.id).await?;
    let stored = store.images_for_board(board.id).await?;
    log::info!("Replay finished: {} image(s) stored", stored.len());

    let canvas = session.canvas();
    Ok(ReplayReport {
        board,
        images: canvas.scene.images_ordered().into_iter().cloned().collect(),
        strokes: canvas.scene.strokes().to_vec(),
        selection: canvas.selection.ids().to_vec(),
        zoom: canvas.viewport.zoom(),
        offset: canvas.viewport.offset,
        palette: canvas.scene.board_palette(),
        cursors: session
            .presence()
            .visible_cursors()
            .into_iter()
            .filter_map(|actor| {
                actor.cursor.map(|position| CursorReport {
                    actor_id: actor.id.clone(),
                    name: actor.name.clone(),
                    color: actor.color,
                    position,
                })
            })
            .collect(),
        outgoing,
        rolled_back,
        selection_rect: session.machine().selection_rect(),
        active_stroke: session.machine().active_stroke().cloned(),
    })
}
