//! Geometry primitives for snapping.
//!
//! Points, rectangles and affine transforms come straight from kurbo. This
//! module adds the infinite [`Line`] used for guides, grid lines and drag
//! constraints, plus the tolerant comparisons every snapper relies on.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Scalar used for distances and line parameters.
pub type Coord = f64;

/// A finite line segment (kurbo's `Line` is a segment, not an infinite line).
pub type Segment = kurbo::Line;

/// Relative epsilon for comparisons in document space.
pub const EPSILON: f64 = 1e-9;

/// Compare two coordinates with a relative epsilon.
///
/// Document coordinates come out of repeated affine transforms, so exact
/// equality is never meaningful.
pub fn approx_eq(a: Coord, b: Coord) -> bool {
    (a - b).abs() <= EPSILON * 1f64.max(a.abs()).max(b.abs())
}

/// Check whether two points coincide within [`EPSILON`].
pub fn points_coincide(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

/// An infinite line: a reference point plus a unit direction.
///
/// The direction is normalized on construction and degenerate directions
/// are rejected, so projections and intersections never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LineRepr")]
pub struct Line {
    origin: Point,
    direction: Vec2,
}

#[derive(Deserialize)]
struct LineRepr {
    origin: Point,
    direction: Vec2,
}

impl TryFrom<LineRepr> for Line {
    type Error = String;

    fn try_from(repr: LineRepr) -> Result<Self, Self::Error> {
        Line::new(repr.origin, repr.direction)
            .ok_or_else(|| format!("degenerate line direction {:?}", repr.direction))
    }
}

impl Line {
    /// Create a line through `origin` along `direction`.
    ///
    /// Returns `None` for zero-length or non-finite directions.
    pub fn new(origin: Point, direction: Vec2) -> Option<Self> {
        let length = direction.hypot();
        if !length.is_finite() || length < EPSILON || !origin.x.is_finite() || !origin.y.is_finite() {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Line through two distinct points.
    pub fn through(a: Point, b: Point) -> Option<Self> {
        Self::new(a, b - a)
    }

    /// Line through `origin` at `angle` radians from the positive x axis.
    pub fn from_angle(origin: Point, angle: f64) -> Self {
        Self {
            origin,
            direction: Vec2::new(angle.cos(), angle.sin()),
        }
    }

    /// Horizontal line `y = const`.
    pub fn horizontal(y: Coord) -> Self {
        Self {
            origin: Point::new(0.0, y),
            direction: Vec2::new(1.0, 0.0),
        }
    }

    /// Vertical line `x = const`.
    pub fn vertical(x: Coord) -> Self {
        Self {
            origin: Point::new(x, 0.0),
            direction: Vec2::new(0.0, 1.0),
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Unit direction vector.
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Unit normal (direction rotated by +90°).
    pub fn normal(&self) -> Vec2 {
        Vec2::new(-self.direction.y, self.direction.x)
    }

    /// Angle of the direction in radians.
    pub fn angle(&self) -> f64 {
        self.direction.atan2()
    }

    /// Point at parameter `t` (signed distance from the origin).
    pub fn point_at(&self, t: Coord) -> Point {
        self.origin + self.direction * t
    }

    /// Parameter of the orthogonal projection of `p`.
    pub fn nearest_time(&self, p: Point) -> Coord {
        (p - self.origin).dot(self.direction)
    }

    /// Orthogonal projection of `p` onto the line.
    pub fn project(&self, p: Point) -> Point {
        self.point_at(self.nearest_time(p))
    }

    /// Perpendicular distance from `p` to the line.
    pub fn distance(&self, p: Point) -> Coord {
        (p - self.origin).cross(self.direction).abs()
    }

    /// Check whether `p` lies on the line within a relative epsilon.
    pub fn contains(&self, p: Point) -> bool {
        let scale = 1f64.max(p.to_vec2().hypot()).max(self.origin.to_vec2().hypot());
        self.distance(p) <= EPSILON * scale * 1e3
    }

    /// Check whether two lines are parallel (or anti-parallel).
    pub fn is_parallel(&self, other: &Line) -> bool {
        self.direction.cross(other.direction).abs() < EPSILON
    }

    /// Intersection point of two lines; `None` when they are parallel.
    pub fn intersect(&self, other: &Line) -> Option<Point> {
        let denom = self.direction.cross(other.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = (other.origin - self.origin).cross(other.direction) / denom;
        let point = self.point_at(t);
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }

    /// Apply an affine transform; `None` if the transform collapses the line.
    pub fn transform(&self, affine: Affine) -> Option<Line> {
        Line::through(affine * self.origin, affine * (self.origin + self.direction))
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> Coord {
    a.distance(b)
}

/// Orthogonal projection of `p` onto `line`.
pub fn project_onto_line(p: Point, line: &Line) -> Point {
    line.project(p)
}

/// Scalar parameter of the projection of `p` onto `line`.
pub fn nearest_time_on_line(p: Point, line: &Line) -> Coord {
    line.nearest_time(p)
}

/// Intersection of two infinite lines, `None` when parallel.
pub fn intersect_lines(a: &Line, b: &Line) -> Option<Point> {
    a.intersect(b)
}

pub fn translate(p: Point, offset: Vec2) -> Point {
    p + offset
}

/// Rotate `p` by `angle` radians around `center`.
pub fn rotate_about(p: Point, angle: f64, center: Point) -> Point {
    Affine::rotate_about(angle, center) * p
}

/// Scale `p` by a per-axis `factor` around `center`.
pub fn scale_about(p: Point, factor: Vec2, center: Point) -> Point {
    let offset = p - center;
    center + Vec2::new(offset.x * factor.x, offset.y * factor.y)
}

/// Check whether a segment has (numerically) zero length.
pub fn segment_is_degenerate(segment: &Segment) -> bool {
    (segment.p1 - segment.p0).hypot2() < EPSILON * EPSILON
}

/// Nearest point on a segment, clamped to its endpoints.
pub fn nearest_on_segment(p: Point, segment: &Segment) -> Point {
    let seg = segment.p1 - segment.p0;
    let len_sq = seg.hypot2();
    if len_sq < EPSILON * EPSILON {
        return segment.p0;
    }
    let t = ((p - segment.p0).dot(seg) / len_sq).clamp(0.0, 1.0);
    segment.p0 + seg * t
}

/// Intersection of a segment with an infinite line.
pub fn intersect_segment_line(segment: &Segment, line: &Line) -> Option<Point> {
    let carrier = Line::through(segment.p0, segment.p1)?;
    let point = carrier.intersect(line)?;
    let t = carrier.nearest_time(point);
    let length = segment.p0.distance(segment.p1);
    let slack = EPSILON * 1f64.max(length);
    (t >= -slack && t <= length + slack).then_some(point)
}

/// Intersection of two segments (proper crossings and touching endpoints).
pub fn intersect_segments(a: &Segment, b: &Segment) -> Option<Point> {
    let line_b = Line::through(b.p0, b.p1)?;
    let point = intersect_segment_line(a, &line_b)?;
    let t = line_b.nearest_time(point);
    let length = b.p0.distance(b.p1);
    let slack = EPSILON * 1f64.max(length);
    (t >= -slack && t <= length + slack).then_some(point)
}

/// Curve a constrained drag is locked to.
///
/// Straight drags (axis locks, scaling along a ray, angular steps) move on a
/// [`Line`]; a rotation moves every point on a circle around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Line(Line),
    Circle { center: Point, radius: Coord },
}

impl From<Line> for Constraint {
    fn from(line: Line) -> Self {
        Constraint::Line(line)
    }
}

impl Constraint {
    /// Circle around `center` passing through `through`.
    ///
    /// `None` when the two coincide: a point on the center cannot rotate.
    pub fn circle_through(center: Point, through: Point) -> Option<Self> {
        let radius = center.distance(through);
        (radius.is_finite() && radius > EPSILON).then_some(Constraint::Circle { center, radius })
    }

    /// Nearest point of the constraint to `p`.
    pub fn project(&self, p: Point) -> Point {
        match *self {
            Constraint::Line(line) => line.project(p),
            Constraint::Circle { center, radius } => {
                let offset = p - center;
                let length = offset.hypot();
                if length < EPSILON {
                    // Every point of the circle is equally near
                    center + Vec2::new(radius, 0.0)
                } else {
                    center + offset * (radius / length)
                }
            }
        }
    }

    /// Check whether `p` lies on the constraint within a relative epsilon.
    pub fn contains(&self, p: Point) -> bool {
        match *self {
            Constraint::Line(line) => line.contains(p),
            Constraint::Circle { center, radius } => {
                let scale = 1f64.max(p.to_vec2().hypot()).max(center.to_vec2().hypot()).max(radius);
                (p.distance(center) - radius).abs() <= EPSILON * scale * 1e3
            }
        }
    }

    /// Points where an infinite line crosses the constraint.
    pub fn crossings_with_line(&self, line: &Line) -> Vec<Point> {
        match *self {
            Constraint::Line(own) => own.intersect(line).into_iter().collect(),
            Constraint::Circle { center, radius } => {
                let foot = line.project(center);
                let offset = line.distance(center);
                let slack = EPSILON * 1f64.max(radius) * 1e3;
                if offset > radius + slack {
                    return Vec::new();
                }
                let half_chord = (radius * radius - offset * offset).max(0.0).sqrt();
                if half_chord <= slack {
                    // Tangent
                    return vec![foot];
                }
                let step = line.direction() * half_chord;
                vec![foot - step, foot + step]
            }
        }
    }

    /// Points where a segment crosses the constraint.
    pub fn crossings_with_segment(&self, segment: &Segment) -> Vec<Point> {
        if let Constraint::Line(line) = self {
            return intersect_segment_line(segment, line).into_iter().collect();
        }
        let Some(carrier) = Line::through(segment.p0, segment.p1) else {
            return if self.contains(segment.p0) { vec![segment.p0] } else { Vec::new() };
        };
        let length = segment.p0.distance(segment.p1);
        let slack = EPSILON * 1f64.max(length);
        self.crossings_with_line(&carrier)
            .into_iter()
            .filter(|&p| {
                let t = carrier.nearest_time(p);
                t >= -slack && t <= length + slack
            })
            .collect()
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Constraint::Line(line) => Some(line),
            Constraint::Circle { .. } => None,
        }
    }
}

/// The point of `points` nearest to `p`.
pub fn nearest_to(points: impl IntoIterator<Item = Point>, p: Point) -> Option<Point> {
    points.into_iter().min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)))
}

/// Corners of a rectangle, clockwise from the minimum corner.
pub fn rect_corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Edges of a rectangle in the same order as [`rect_corners`].
pub fn rect_edges(rect: Rect) -> [Segment; 4] {
    let [a, b, c, d] = rect_corners(rect);
    [Segment::new(a, b), Segment::new(b, c), Segment::new(c, d), Segment::new(d, a)]
}

/// Bounding box of a set of points, `None` when empty.
pub fn bounds_of(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut points = points.into_iter();
    let first = points.next()?;
    Some(points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p)))
}

/// Closed-interval overlap, so touching rectangles overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Smallest `offset + k * step` that is `>= value`.
pub fn ceil_to_multiple(value: Coord, step: Coord, offset: Coord) -> Coord {
    ((value - offset) / step).ceil() * step + offset
}

/// Largest `offset + k * step` that is `<= value`.
pub fn floor_to_multiple(value: Coord, step: Coord, offset: Coord) -> Coord {
    ((value - offset) / step).floor() * step + offset
}
