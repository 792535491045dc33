//! Pure transforms snapped as a whole.
//!
//! A multi-point drag (moving, scaling or rotating a selection) snaps every
//! transformed control point, refits the transform to each snap found and
//! keeps the refit that disturbs the selection least.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::geom::{approx_eq, rotate_about, scale_about, Constraint, Line, EPSILON};
use crate::results::{SnapResult, SnappedPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn unit(self) -> Vec2 {
        match self {
            Axis::X => Vec2::new(1.0, 0.0),
            Axis::Y => Vec2::new(0.0, 1.0),
        }
    }

    fn of(self, v: Vec2) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }
}

/// Transform applied to a dragged selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PureTransform {
    /// Move by `vector`, optionally only along `constrain_to`.
    Translate { vector: Vec2, constrain_to: Option<Vec2> },
    /// Scale about `origin`.
    Scale { factor: Vec2, origin: Point, uniform: bool },
    /// Scale along one axis (both axes when `uniform`).
    Stretch {
        magnitude: f64,
        origin: Point,
        axis: Axis,
        uniform: bool,
    },
    /// Rotate by `angle` radians about `origin`.
    Rotate { angle: f64, origin: Point },
}

impl PureTransform {
    pub fn translate(vector: Vec2) -> Self {
        PureTransform::Translate {
            vector,
            constrain_to: None,
        }
    }

    pub fn scale(factor: Vec2, origin: Point, uniform: bool) -> Self {
        PureTransform::Scale { factor, origin, uniform }
    }

    pub fn rotate(angle: f64, origin: Point) -> Self {
        PureTransform::Rotate { angle, origin }
    }

    fn stretch_factor(magnitude: f64, axis: Axis, uniform: bool) -> Vec2 {
        match (uniform, axis) {
            (true, _) => Vec2::new(magnitude, magnitude),
            (false, Axis::X) => Vec2::new(magnitude, 1.0),
            (false, Axis::Y) => Vec2::new(1.0, magnitude),
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        match *self {
            PureTransform::Translate { vector, .. } => p + vector,
            PureTransform::Scale { factor, origin, .. } => scale_about(p, factor, origin),
            PureTransform::Stretch {
                magnitude,
                origin,
                axis,
                uniform,
            } => scale_about(p, Self::stretch_factor(magnitude, axis, uniform), origin),
            PureTransform::Rotate { angle, origin } => rotate_about(p, angle, origin),
        }
    }

    pub fn affine(&self) -> Affine {
        match *self {
            PureTransform::Translate { vector, .. } => Affine::translate(vector),
            PureTransform::Scale { factor, origin, .. } => scale_affine(factor, origin),
            PureTransform::Stretch {
                magnitude,
                origin,
                axis,
                uniform,
            } => scale_affine(Self::stretch_factor(magnitude, axis, uniform), origin),
            PureTransform::Rotate { angle, origin } => Affine::rotate_about(angle, origin),
        }
    }

    /// Curve the image of `original` is restricted to, if any.
    ///
    /// A rotation keeps every point on its circle around the origin.
    pub fn constraint(&self, original: Point) -> Option<Constraint> {
        let moved = self.apply(original);
        let line = match *self {
            PureTransform::Translate { constrain_to, .. } => Line::new(moved, constrain_to?),
            PureTransform::Scale { origin, uniform: true, .. }
            | PureTransform::Stretch { origin, uniform: true, .. } => Line::through(origin, moved),
            PureTransform::Stretch { axis, .. } => Line::new(moved, axis.unit()),
            PureTransform::Rotate { origin, .. } => return Constraint::circle_through(origin, moved),
            PureTransform::Scale { .. } => None,
        };
        line.map(Constraint::from)
    }

    /// The same kind of transform, refitted so `original` lands as near
    /// `target` as the transform allows.
    ///
    /// `None` when `original` gives no leverage (it sits on the scale or
    /// rotation origin, or on the stretch axis). A rotation only reaches
    /// targets at the same distance from its origin; check with
    /// [`reaches`](Self::reaches).
    pub fn fitted(&self, original: Point, target: Point) -> Option<Self> {
        let fitted = match *self {
            PureTransform::Translate { constrain_to, .. } => {
                let mut vector = target - original;
                if let Some(direction) = constrain_to {
                    let unit = Line::new(Point::ZERO, direction)?.direction();
                    vector = unit * vector.dot(unit);
                }
                PureTransform::Translate { vector, constrain_to }
            }
            PureTransform::Scale { factor, origin, uniform } => {
                let from = original - origin;
                let to = target - origin;
                let ratio = |a: f64, b: f64, keep: f64| if a.abs() > EPSILON { b / a } else { keep };
                if from.x.abs() <= EPSILON && from.y.abs() <= EPSILON {
                    return None;
                }
                let mut factor = Vec2::new(ratio(from.x, to.x, factor.x), ratio(from.y, to.y, factor.y));
                if uniform {
                    let f = if from.x.abs() >= from.y.abs() { factor.x } else { factor.y };
                    factor = Vec2::new(f, f);
                }
                PureTransform::Scale { factor, origin, uniform }
            }
            PureTransform::Stretch {
                origin, axis, uniform, ..
            } => {
                let from = axis.of(original - origin);
                if from.abs() <= EPSILON {
                    return None;
                }
                PureTransform::Stretch {
                    magnitude: axis.of(target - origin) / from,
                    origin,
                    axis,
                    uniform,
                }
            }
            PureTransform::Rotate { origin, .. } => {
                let from = original - origin;
                let to = target - origin;
                if from.hypot() <= EPSILON || to.hypot() <= EPSILON {
                    return None;
                }
                PureTransform::Rotate {
                    angle: to.atan2() - from.atan2(),
                    origin,
                }
            }
        };
        fitted.is_finite().then_some(fitted)
    }

    /// Whether `original` lands on `target` under this transform.
    pub fn reaches(&self, original: Point, target: Point) -> bool {
        let landed = self.apply(original);
        let scale = 1f64.max(target.to_vec2().hypot());
        landed.distance(target) <= REACH_TOLERANCE * scale
    }

    fn is_finite(&self) -> bool {
        match *self {
            PureTransform::Translate { vector, .. } => vector.is_finite(),
            PureTransform::Scale { factor, .. } => factor.is_finite(),
            PureTransform::Stretch { magnitude, .. } => magnitude.is_finite(),
            PureTransform::Rotate { angle, .. } => angle.is_finite(),
        }
    }

    /// Sum of the distances between the images of `points` under both transforms.
    pub fn displacement_from(&self, other: &PureTransform, points: &[Point]) -> f64 {
        points.iter().map(|&p| self.apply(p).distance(other.apply(p))).sum()
    }
}

/// Relative slack for [`PureTransform::reaches`].
const REACH_TOLERANCE: f64 = 1e-6;

fn scale_affine(factor: Vec2, origin: Point) -> Affine {
    Affine::translate(origin.to_vec2()) * Affine::scale_non_uniform(factor.x, factor.y) * Affine::translate(-origin.to_vec2())
}

/// Outcome of snapping a transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnap {
    /// The refitted transform, or the requested one when nothing snapped.
    pub transform: PureTransform,
    /// The snap that drove the refit.
    pub result: SnapResult,
}

/// Keeps the refit with the smallest total displacement.
pub(crate) struct TransformChoice<'a> {
    base: PureTransform,
    originals: &'a [Point],
    best: Option<(f64, PureTransform, SnappedPoint)>,
}

impl<'a> TransformChoice<'a> {
    pub(crate) fn new(base: PureTransform, originals: &'a [Point]) -> Self {
        Self {
            base,
            originals,
            best: None,
        }
    }

    /// Consider a snap of the transformed point `snapped.source_index`.
    ///
    /// Snaps the refitted transform cannot carry the point onto are dropped.
    pub(crate) fn offer(&mut self, snapped: SnappedPoint) {
        let Some(&original) = self.originals.get(snapped.source_index) else {
            return;
        };
        let Some(fitted) = self.base.fitted(original, snapped.point) else {
            return;
        };
        if !fitted.reaches(original, snapped.point) {
            log::trace!("Dropping {:?} snap the refitted transform misses", snapped.target);
            return;
        }
        let displacement = fitted.displacement_from(&self.base, self.originals);
        let replace = match &self.best {
            None => true,
            Some((best, _, current)) if approx_eq(displacement, *best) => snapped.is_better_than(current),
            Some((best, ..)) => displacement < *best,
        };
        if replace {
            self.best = Some((displacement, fitted, snapped));
        }
    }

    pub(crate) fn finish(self) -> TransformSnap {
        match self.best {
            Some((displacement, transform, snapped)) => {
                log::trace!("Transform snapped with total displacement {:.4}", displacement);
                let original = self.originals[snapped.source_index];
                let moved = self.base.apply(original);
                let landed = transform.apply(original);
                let result = SnapResult {
                    point: landed,
                    offset: landed - moved,
                    distance: landed.distance(moved),
                    ..SnapResult::from_snapped(&snapped, moved)
                };
                TransformSnap { transform, result }
            }
            None => TransformSnap {
                transform: self.base,
                result: SnapResult::none(self.originals.first().map_or(Point::ZERO, |&p| self.base.apply(p))),
            },
        }
    }
}
