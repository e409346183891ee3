//! Pure geometry helpers shared by the viewport, scene and gesture code.

use kurbo::{Point, Rect, Vec2};

/// Bound `value` to `[min, max]`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a - b).hypot()
}

/// Map a screen point into world space: `(screen - pan) / zoom`.
pub fn screen_to_world(screen: Point, pan: Vec2, zoom: f64) -> Point {
    Point::new((screen.x - pan.x) / zoom, (screen.y - pan.y) / zoom)
}

/// Map a world point into screen space: `world * zoom + pan`.
pub fn world_to_screen(world: Point, pan: Vec2, zoom: f64) -> Point {
    Point::new(world.x * zoom + pan.x, world.y * zoom + pan.y)
}

/// Strict open-interval overlap test.
///
/// Rectangles that only share an edge do not intersect.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    let a = a.abs();
    let b = b.abs();
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Normalized rectangle spanned by two corner points.
pub fn rect_from_points(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b).abs()
}

/// Angle from `center` to `point` in degrees, as returned by `atan2`.
pub fn angle_degrees(center: Point, point: Point) -> f64 {
    (point.y - center.y).atan2(point.x - center.x).to_degrees()
}

/// Rotate `point` around `center` by `degrees` (clockwise in screen space).
pub fn rotate_about(point: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let d = point - center;
    Point::new(
        center.x + d.x * cos - d.y * sin,
        center.y + d.x * sin + d.y * cos,
    )
}

/// Whether every coordinate is finite.
pub fn is_finite_point(point: Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}
