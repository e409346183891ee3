//! Freehand drawing layer: brush configuration and strokes.

use crate::color::Rgba;
use kurbo::{BezPath, Cap, Join, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stroke.
pub type StrokeId = Uuid;

/// Smallest allowed stroke width.
pub const MIN_STROKE_WIDTH: f64 = 1.0;
/// Largest allowed stroke width.
pub const MAX_STROKE_WIDTH: f64 = 20.0;

/// Opacity used by the pencil style.
pub const PENCIL_OPACITY: f64 = 0.7;
/// Dash pattern used by the pencil style.
pub const PENCIL_DASHES: [f64; 2] = [2.0, 2.0];

/// Drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawTool {
    #[default]
    Pen,
    Pencil,
    Brush,
}

impl DrawTool {
    /// Style a freshly picked tool starts with.
    pub fn default_style(self) -> StrokeStyle {
        match self {
            DrawTool::Pen => StrokeStyle::Solid,
            DrawTool::Pencil => StrokeStyle::Pencil,
            DrawTool::Brush => StrokeStyle::Brush,
        }
    }

    /// Width a freshly picked tool starts with.
    pub fn default_width(self) -> f64 {
        match self {
            DrawTool::Pen => 2.0,
            DrawTool::Pencil => 4.0,
            DrawTool::Brush => 8.0,
        }
    }
}

/// Visual style of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeStyle {
    /// Full opacity, continuous line.
    #[default]
    Solid,
    /// Reduced opacity, short dashes.
    Pencil,
    /// Full opacity, continuous line.
    Brush,
}

impl StrokeStyle {
    pub fn opacity(self) -> f64 {
        match self {
            StrokeStyle::Solid | StrokeStyle::Brush => 1.0,
            StrokeStyle::Pencil => PENCIL_OPACITY,
        }
    }

    /// Dash pattern in world units; empty for continuous lines.
    pub fn dash_pattern(self) -> &'static [f64] {
        match self {
            StrokeStyle::Pencil => &PENCIL_DASHES,
            StrokeStyle::Solid | StrokeStyle::Brush => &[],
        }
    }
}

/// Current drawing configuration, read when a stroke begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub tool: DrawTool,
    width: f64,
    pub style: StrokeStyle,
    pub color: Rgba,
}

impl Default for Brush {
    fn default() -> Self {
        Self::for_tool(DrawTool::default())
    }
}

impl Brush {
    /// Brush with the tool's default style and width.
    pub fn for_tool(tool: DrawTool) -> Self {
        Self {
            tool,
            width: tool.default_width(),
            style: tool.default_style(),
            color: Rgba::black(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Set the width, clamped to 1..=20.
    pub fn set_width(&mut self, width: f64) {
        if width.is_finite() {
            self.width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.set_width(width);
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }
}

/// Drawing settings owned by the canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingSettings {
    /// While enabled every primary pointer-down starts a stroke.
    pub enabled: bool,
    pub brush: Brush,
}

/// A freehand stroke: a polyline through its captured points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub tool: DrawTool,
    pub width: f64,
    pub style: StrokeStyle,
    pub color: Rgba,
    /// Points in world coordinates.
    points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at `point`, capturing the brush as it is right now.
    pub fn begin(brush: &Brush, point: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: brush.tool,
            width: brush.width(),
            style: brush.style,
            color: brush.color,
            points: vec![point],
        }
    }

    /// Append a point.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn opacity(&self) -> f64 {
        self.style.opacity()
    }

    /// Color with the style's opacity folded into alpha.
    pub fn render_color(&self) -> Rgba {
        self.color.with_opacity(self.opacity())
    }

    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p))
    }

    /// Direct polyline through every point, no smoothing.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut points = self.points.iter();
        if let Some(first) = points.next() {
            path.move_to(*first);
            for point in points {
                path.line_to(*point);
            }
        }
        path
    }

    /// Stroke parameters for a renderer.
    pub fn kurbo_stroke(&self) -> kurbo::Stroke {
        kurbo::Stroke::new(self.width)
            .with_caps(Cap::Round)
            .with_join(Join::Round)
            .with_dashes(0.0, self.style.dash_pattern().iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brush_width_clamped() {
        let mut brush = Brush::default();
        brush.set_width(0.0);
        assert_eq!(brush.width(), 1.0);
        brush.set_width(40.0);
        assert_eq!(brush.width(), 20.0);
        brush.set_width(20.0);
        assert_eq!(brush.width(), 20.0);
    }

    #[test]
    fn test_tool_defaults() {
        assert_eq!(Brush::for_tool(DrawTool::Pencil).style, StrokeStyle::Pencil);
        assert!(DrawTool::Brush.default_width() > DrawTool::Pen.default_width());
    }

    #[test]
    fn test_pencil_stroke() {
        let color = Rgba::rgb(0x5B, 0x4C, 0xFF);
        let brush = Brush::for_tool(DrawTool::Pencil).with_width(4.0).with_color(color);
        let mut stroke = Stroke::begin(&brush, Point::new(0.0, 0.0));
        stroke.add_point(Point::new(10.0, 0.0));
        stroke.add_point(Point::new(10.0, 10.0));

        assert_eq!(
            stroke.points(),
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
        );
        assert!((stroke.opacity() - 0.7).abs() < f64::EPSILON);
        assert!(!stroke.style.dash_pattern().is_empty());
        assert_eq!(stroke.color, color);
        assert_eq!(stroke.width, 4.0);
    }

    #[test]
    fn test_brush_changes_do_not_affect_started_stroke() {
        let mut brush = Brush::default();
        let stroke = Stroke::begin(&brush, Point::ZERO);
        brush.color = Rgba::rgb(255, 0, 0);
        brush.style = StrokeStyle::Pencil;
        assert_eq!(stroke.color, Rgba::black());
        assert_eq!(stroke.style, StrokeStyle::Solid);
    }

    #[test]
    fn test_path_is_polyline() {
        let mut stroke = Stroke::begin(&Brush::default(), Point::new(0.0, 0.0));
        stroke.add_point(Point::new(5.0, 5.0));
        stroke.add_point(Point::new(10.0, 0.0));
        // move_to + two line_to
        assert_eq!(stroke.to_path().elements().len(), 3);
    }

    #[test]
    fn test_bounds() {
        let mut stroke = Stroke::begin(&Brush::default(), Point::new(0.0, 0.0));
        stroke.add_point(Point::new(100.0, 50.0));
        stroke.add_point(Point::new(50.0, 100.0));
        let bounds = stroke.bounds();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_solid_stroke_has_no_dashes() {
        let stroke = Stroke::begin(&Brush::default(), Point::ZERO);
        assert!(stroke.kurbo_stroke().dash_pattern.is_empty());
        assert_eq!(stroke.render_color().a, 255);
    }
}
