//! Pointer gesture state machine.
//!
//! Turns raw pointer events into one of pan, rubber-band selection, image
//! drag/resize/rotate or freehand drawing. The active gesture owns pointer
//! capture: once started, every move is routed to it no matter what lies
//! under the pointer, and it ends exactly once through [`InteractionMachine::finish`].

use crate::canvas::Canvas;
use crate::config::SessionConfig;
use crate::drawing::{Stroke, StrokeId};
use crate::geometry;
use crate::image::{BoardImage, ImageId, ImagePatch};
use crate::input::{Modifiers, MouseButton, PointerEvent};
use crate::selection::{self, Corner, PickKind};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Kind of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Panning,
    RectSelecting,
    Dragging,
    Resizing(Corner),
    Rotating,
    Drawing,
}

/// Side effects of handling an event, for the session to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Pointer moved over the canvas (screen coordinates).
    Cursor(Point),
    /// An image was changed optimistically.
    ImageUpdated {
        id: ImageId,
        patch: ImagePatch,
        previous: BoardImage,
    },
    SelectionChanged,
    ViewportChanged,
    /// A gesture took pointer capture.
    GestureStarted(GestureKind),
    /// A gesture released pointer capture.
    GestureEnded(GestureKind),
    StrokeCompleted(StrokeId),
}

/// Start data for each gesture.
#[derive(Debug, Clone)]
enum Gesture {
    Panning {
        start_pointer: Point,
        start_offset: Vec2,
    },
    RectSelecting {
        start: Point,
        current: Point,
    },
    Dragging {
        image: ImageId,
        start_pointer: Point,
        start_position: Point,
    },
    Resizing {
        image: ImageId,
        corner: Corner,
        start_pointer: Point,
        start_position: Point,
        start_size: Size,
    },
    Rotating {
        image: ImageId,
        /// Image center in screen space, fixed at gesture start.
        center: Point,
        start_pointer: Point,
        start_rotation: f64,
    },
    Drawing {
        stroke: Stroke,
    },
}

impl Gesture {
    fn kind(&self) -> GestureKind {
        match self {
            Gesture::Panning { .. } => GestureKind::Panning,
            Gesture::RectSelecting { .. } => GestureKind::RectSelecting,
            Gesture::Dragging { .. } => GestureKind::Dragging,
            Gesture::Resizing { corner, .. } => GestureKind::Resizing(*corner),
            Gesture::Rotating { .. } => GestureKind::Rotating,
            Gesture::Drawing { .. } => GestureKind::Drawing,
        }
    }
}

/// How a gesture ends.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Exit {
    /// Pointer released or left the surface; pending results are committed.
    Commit(Option<Point>),
    /// Aborted; rect selection and strokes are discarded.
    Cancel,
}

/// Single-pointer gesture interpreter.
#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    active: Option<Gesture>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the gesture holding capture, if any.
    pub fn active_kind(&self) -> Option<GestureKind> {
        self.active.as_ref().map(Gesture::kind)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Rubber-band rectangle in screen space while rect-selecting.
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.active {
            Some(Gesture::RectSelecting { start, current }) => Some(geometry::rect_from_points(*start, *current)),
            _ => None,
        }
    }

    /// The stroke being drawn, for live rendering.
    pub fn active_stroke(&self) -> Option<&Stroke> {
        match &self.active {
            Some(Gesture::Drawing { stroke }) => Some(stroke),
            _ => None,
        }
    }

    /// Dispatch a pointer event.
    pub fn handle(&mut self, canvas: &mut Canvas, config: &SessionConfig, event: &PointerEvent) -> Vec<Effect> {
        match *event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(canvas, config, position, button, modifiers),
            PointerEvent::Move { position } => self.pointer_move(canvas, position),
            PointerEvent::Up { position, .. } => self.finish(canvas, Exit::Commit(Some(position))),
            PointerEvent::Leave => self.finish(canvas, Exit::Commit(None)),
        }
    }

    /// End the active gesture without committing a rect selection or stroke.
    pub fn cancel(&mut self, canvas: &mut Canvas) -> Vec<Effect> {
        self.finish(canvas, Exit::Cancel)
    }

    fn pointer_down(
        &mut self,
        canvas: &mut Canvas,
        config: &SessionConfig,
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    ) -> Vec<Effect> {
        if !button.is_primary() || self.active.is_some() {
            return Vec::new();
        }
        let mut effects = Vec::new();

        let gesture = if canvas.drawing.enabled {
            let world = canvas.viewport.screen_to_world(position);
            Gesture::Drawing {
                stroke: Stroke::begin(&canvas.drawing.brush, world),
            }
        } else {
            let hit = canvas.pick(position, config);
            let target = hit.image.and_then(|id| canvas.scene.get_image(id).cloned());
            match (hit.kind, target) {
                (PickKind::Handle(corner), Some(image)) => {
                    Self::select_target(canvas, image.id, &mut effects);
                    Gesture::Resizing {
                        image: image.id,
                        corner,
                        start_pointer: position,
                        start_position: image.position,
                        start_size: image.size,
                    }
                }
                (PickKind::Rotate, Some(image)) => {
                    Self::select_target(canvas, image.id, &mut effects);
                    Gesture::Rotating {
                        image: image.id,
                        center: canvas.viewport.world_to_screen(image.center()),
                        start_pointer: position,
                        start_rotation: image.rotation,
                    }
                }
                (PickKind::Body, Some(image)) => {
                    Self::select_target(canvas, image.id, &mut effects);
                    Gesture::Dragging {
                        image: image.id,
                        start_pointer: position,
                        start_position: image.position,
                    }
                }
                _ if modifiers.shift => Gesture::RectSelecting {
                    start: position,
                    current: position,
                },
                _ => Gesture::Panning {
                    start_pointer: position,
                    start_offset: canvas.viewport.offset,
                },
            }
        };

        let kind = gesture.kind();
        log::debug!("Gesture started: {kind:?} at {position:?}");
        self.active = Some(gesture);
        effects.push(Effect::GestureStarted(kind));
        effects
    }

    fn select_target(canvas: &mut Canvas, id: ImageId, effects: &mut Vec<Effect>) {
        if canvas.selection.ids() != [id] {
            canvas.select(id);
            effects.push(Effect::SelectionChanged);
        }
    }

    fn pointer_move(&mut self, canvas: &mut Canvas, position: Point) -> Vec<Effect> {
        let mut effects = vec![Effect::Cursor(position)];
        let Some(gesture) = self.active.as_mut() else {
            return effects;
        };
        let zoom = canvas.viewport.zoom();

        match gesture {
            Gesture::Panning {
                start_pointer,
                start_offset,
            } => {
                canvas.viewport.offset = *start_offset + (position - *start_pointer);
                effects.push(Effect::ViewportChanged);
            }
            Gesture::RectSelecting { current, .. } => {
                *current = position;
            }
            Gesture::Dragging {
                image,
                start_pointer,
                start_position,
            } => {
                let delta = (position - *start_pointer) / zoom;
                let patch = ImagePatch::position(*start_position + delta);
                effects.extend(Self::update(canvas, *image, patch));
            }
            Gesture::Resizing {
                image,
                corner,
                start_pointer,
                start_position,
                start_size,
            } => {
                let delta = (position - *start_pointer) / zoom;
                let (new_position, new_size) =
                    selection::resize_from_corner(*start_position, *start_size, *corner, delta);
                effects.extend(Self::update(canvas, *image, ImagePatch::resize(new_position, new_size)));
            }
            Gesture::Rotating {
                image,
                center,
                start_pointer,
                start_rotation,
            } => {
                let rotation = selection::rotation_from_drag(*start_rotation, *center, *start_pointer, position);
                effects.extend(Self::update(canvas, *image, ImagePatch::rotation(rotation)));
            }
            Gesture::Drawing { stroke } => {
                stroke.add_point(canvas.viewport.screen_to_world(position));
            }
        }
        effects
    }

    /// Apply an optimistic update, skipping no-ops.
    fn update(canvas: &mut Canvas, id: ImageId, patch: ImagePatch) -> Option<Effect> {
        match canvas.scene.update_image(id, &patch) {
            Ok(previous) if canvas.scene.get_image(id) != Some(&previous) => Some(Effect::ImageUpdated {
                id,
                patch,
                previous,
            }),
            Ok(_) => None,
            Err(err) => {
                log::debug!("Dropping gesture update: {err}");
                None
            }
        }
    }

    /// The single exit path: releases capture and commits or discards.
    fn finish(&mut self, canvas: &mut Canvas, exit: Exit) -> Vec<Effect> {
        let Some(gesture) = self.active.take() else {
            return Vec::new();
        };
        let kind = gesture.kind();
        let mut effects = Vec::new();

        match (gesture, exit) {
            (Gesture::RectSelecting { start, current }, Exit::Commit(end)) => {
                let end = end.unwrap_or(current);
                let world = geometry::rect_from_points(
                    canvas.viewport.screen_to_world(start),
                    canvas.viewport.screen_to_world(end),
                );
                let hits = canvas.scene.images_in_rect(world);
                log::debug!("Rect selection {world:?} hit {} image(s)", hits.len());
                canvas.select_many(hits);
                effects.push(Effect::SelectionChanged);
            }
            (Gesture::Drawing { stroke }, Exit::Commit(_)) => {
                let id = stroke.id;
                canvas.scene.push_stroke(stroke);
                effects.push(Effect::StrokeCompleted(id));
            }
            _ => {}
        }

        log::debug!("Gesture ended: {kind:?} ({exit:?})");
        effects.push(Effect::GestureEnded(kind));
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{Brush, DrawTool, StrokeStyle};
    use crate::color::Rgba;
    use crate::image::ImageSpec;

    const EPS: f64 = 1e-9;

    fn setup() -> (Canvas, SessionConfig, InteractionMachine) {
        let config = SessionConfig::default();
        (Canvas::new(&config), config, InteractionMachine::new())
    }

    fn shift_down(position: Point) -> PointerEvent {
        PointerEvent::Down {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::SHIFT,
        }
    }

    fn square(canvas: &mut Canvas, x: f64, y: f64) -> ImageId {
        canvas
            .scene
            .add_image(ImageSpec::new("a.png").at(Point::new(x, y)).with_size(100.0, 100.0))
            .id
    }

    #[test]
    fn test_pan() {
        let (mut canvas, config, mut machine) = setup();
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(10.0, 10.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::Panning));

        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(40.0, 30.0)));
        assert_eq!(canvas.viewport.offset, Vec2::new(30.0, 20.0));

        let effects = machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(40.0, 30.0)));
        assert!(machine.is_idle());
        assert_eq!(effects, vec![Effect::GestureEnded(GestureKind::Panning)]);
    }

    #[test]
    fn test_drag_divides_by_zoom() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        canvas.viewport.set_zoom(2.0);

        // Image body spans screen 0..200 at zoom 2.
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(100.0, 100.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::Dragging));
        assert!(canvas.is_selected(id));

        let effects = machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(140.0, 120.0)));
        assert!(matches!(effects[0], Effect::Cursor(_)));
        assert!(matches!(&effects[1], Effect::ImageUpdated { id: updated, .. } if *updated == id));
        assert_eq!(canvas.scene.get_image(id).unwrap().position, Point::new(20.0, 10.0));
    }

    #[test]
    fn test_drag_keeps_capture_off_image() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(50.0, 50.0)));
        // Far away from the image: still routed to the drag.
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(1050.0, 50.0)));
        assert_eq!(canvas.scene.get_image(id).unwrap().position, Point::new(1000.0, 0.0));
    }

    #[test]
    fn test_resize_from_handle() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(98.0, 98.0)));
        assert_eq!(
            machine.active_kind(),
            Some(GestureKind::Resizing(Corner::BottomRight))
        );
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(0.0, 0.0)));
        let image = canvas.scene.get_image(id).unwrap();
        assert_eq!(image.size, Size::new(50.0, 50.0));
        assert_eq!(image.position, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_resize_top_left_at_zoom() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 50.0, 50.0);
        canvas.select(id);
        canvas.viewport.set_zoom(2.0);

        // Top-left corner of world (50, 50) sits at screen (100, 100).
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(101.0, 101.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::Resizing(Corner::TopLeft)));

        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(141.0, 161.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(141.0, 161.0)));
        let image = canvas.scene.get_image(id).unwrap();
        assert_eq!(image.position, Point::new(70.0, 80.0));
        assert_eq!(image.size, Size::new(80.0, 70.0));
        let bounds = image.bounds();
        assert_eq!((bounds.x1, bounds.y1), (150.0, 150.0));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        canvas.select(id);

        // Rotate handle sits 32px above the top-center (50, 0).
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(50.0, -32.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::Rotating));

        // Center is (50, 50): from straight up to straight right is +90 degrees.
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(150.0, 50.0)));
        let rotation = canvas.scene.get_image(id).unwrap().rotation;
        assert!((rotation - 90.0).abs() < EPS);
    }

    #[test]
    fn test_rect_select_replaces_selection() {
        let (mut canvas, config, mut machine) = setup();
        let a = square(&mut canvas, 0.0, 0.0);
        let b = square(&mut canvas, 200.0, 0.0);
        let c = square(&mut canvas, 400.0, 400.0);
        canvas.select(c);

        machine.handle(&mut canvas, &config, &shift_down(Point::new(-10.0, 150.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::RectSelecting));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(250.0, 50.0)));
        assert!(machine.selection_rect().is_some());
        machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(250.0, 50.0)));

        assert!(canvas.is_selected(a));
        assert!(canvas.is_selected(b));
        assert!(!canvas.is_selected(c));
    }

    #[test]
    fn test_rect_select_edge_touch_excluded() {
        let (mut canvas, config, mut machine) = setup();
        let a = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &shift_down(Point::new(100.0, 0.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(200.0, 100.0)));
        assert!(!canvas.is_selected(a));
    }

    #[test]
    fn test_rect_select_uses_world_space() {
        let (mut canvas, config, mut machine) = setup();
        let a = square(&mut canvas, 0.0, 0.0);
        canvas.viewport.offset = Vec2::new(500.0, 500.0);
        // World 0..100 appears at screen 500..600; the screen-space rect
        // 450..520 would miss it if compared unconverted.
        machine.handle(&mut canvas, &config, &shift_down(Point::new(450.0, 450.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(520.0, 520.0)));
        assert!(canvas.is_selected(a));
    }

    #[test]
    fn test_leave_ends_rect_select() {
        let (mut canvas, config, mut machine) = setup();
        let a = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &shift_down(Point::new(-10.0, -10.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(50.0, 50.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::Leave);
        assert!(machine.is_idle());
        assert!(canvas.is_selected(a));
    }

    #[test]
    fn test_leave_ends_drag() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(50.0, 50.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(70.0, 50.0)));

        let effects = machine.handle(&mut canvas, &config, &PointerEvent::Leave);
        assert!(machine.is_idle());
        assert!(effects.contains(&Effect::GestureEnded(GestureKind::Dragging)));

        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(300.0, 300.0)));
        assert_eq!(canvas.scene.get_image(id).unwrap().position, Point::new(20.0, 0.0));
    }

    #[test]
    fn test_leave_ends_pan() {
        let (mut canvas, config, mut machine) = setup();
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(10.0, 10.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(20.0, 10.0)));

        let effects = machine.handle(&mut canvas, &config, &PointerEvent::Leave);
        assert!(machine.is_idle());
        assert!(effects.contains(&Effect::GestureEnded(GestureKind::Panning)));

        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(90.0, 90.0)));
        assert_eq!(canvas.viewport.offset, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_cancel_discards_rect_select() {
        let (mut canvas, config, mut machine) = setup();
        let a = square(&mut canvas, 0.0, 0.0);
        machine.handle(&mut canvas, &config, &shift_down(Point::new(-10.0, -10.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(50.0, 50.0)));
        let effects = machine.cancel(&mut canvas);
        assert_eq!(effects, vec![Effect::GestureEnded(GestureKind::RectSelecting)]);
        assert!(!canvas.is_selected(a));
    }

    #[test]
    fn test_drawing_takes_precedence() {
        let (mut canvas, config, mut machine) = setup();
        let id = square(&mut canvas, 0.0, 0.0);
        let color = Rgba::rgb(0x5B, 0x4C, 0xFF);
        canvas.set_drawing_enabled(true);
        canvas.set_brush(Brush::for_tool(DrawTool::Pencil).with_width(4.0).with_color(color));

        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::new(0.0, 0.0)));
        assert_eq!(machine.active_kind(), Some(GestureKind::Drawing));
        assert!(!canvas.is_selected(id));

        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(10.0, 0.0)));
        machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(10.0, 10.0)));
        assert_eq!(machine.active_stroke().map(Stroke::len), Some(3));
        assert!(canvas.scene.strokes().is_empty());
        let effects = machine.handle(&mut canvas, &config, &PointerEvent::up(Point::new(10.0, 10.0)));
        assert!(effects.iter().any(|e| matches!(e, Effect::StrokeCompleted(_))));
        assert!(machine.active_stroke().is_none());

        let stroke = &canvas.scene.strokes()[0];
        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.style, StrokeStyle::Pencil);
        assert!((stroke.opacity() - 0.7).abs() < EPS);
        assert_eq!(stroke.color, color);
        assert_eq!(canvas.scene.get_image(id).unwrap().position, Point::ZERO);
    }

    #[test]
    fn test_secondary_button_ignored() {
        let (mut canvas, config, mut machine) = setup();
        let effects = machine.handle(
            &mut canvas,
            &config,
            &PointerEvent::Down {
                position: Point::ZERO,
                button: MouseButton::Right,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(effects.is_empty());
        assert!(machine.is_idle());
    }

    #[test]
    fn test_move_without_gesture_reports_cursor() {
        let (mut canvas, config, mut machine) = setup();
        let effects = machine.handle(&mut canvas, &config, &PointerEvent::move_to(Point::new(3.0, 4.0)));
        assert_eq!(effects, vec![Effect::Cursor(Point::new(3.0, 4.0))]);
    }

    #[test]
    fn test_capture_released_once() {
        let (mut canvas, config, mut machine) = setup();
        machine.handle(&mut canvas, &config, &PointerEvent::down(Point::ZERO));
        let first = machine.handle(&mut canvas, &config, &PointerEvent::up(Point::ZERO));
        let second = machine.handle(&mut canvas, &config, &PointerEvent::Leave);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
