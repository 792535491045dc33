//! Snap results and winner selection.
//!
//! Snappers push what they find into an [`IntermSnapResults`]. Once every
//! snapper has run, [`IntermSnapResults::find_best`] adds line intersections
//! and picks the single winner with [`SnappedPoint::is_better_than`].

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::candidate::{SnapCandidatePoint, SnapSource, SnapTarget};
use crate::document::ObjectId;
use crate::geom::{approx_eq, intersect_segment_line, Coord, Line, Segment};
use crate::preferences::{SnapOption, SnapPreferences};

/// A candidate position the dragged point could snap to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedPoint {
    pub point: Point,
    pub source: SnapSource,
    /// Index of the dragged point within the query.
    pub source_index: usize,
    pub target: SnapTarget,
    /// Distance from the dragged point, in document units.
    pub distance: Coord,
    /// Tolerance of the snapper that produced it, in document units.
    pub tolerance: Coord,
    pub always_snap: bool,
    /// Produced by a constrained snap.
    pub constrained: bool,
    /// Both degrees of freedom are fixed (a point target, or a line
    /// target met along a constraint).
    pub fully_constrained: bool,
    pub object: Option<ObjectId>,
}

impl SnappedPoint {
    pub fn within_tolerance(&self) -> bool {
        self.distance <= self.tolerance
    }

    /// Whether `self` should replace `other` as the current winner.
    ///
    /// 1. An always-snap match beats an ordinary one, unless the ordinary one
    ///    is strictly closer and has a strictly higher priority.
    /// 2. Otherwise the closer one wins.
    /// 3. Equal distances are decided by [`SnapTarget::priority`], then a
    ///    fully constrained match beats a partially constrained one. A
    ///    complete tie keeps `other`, the one found first.
    pub fn is_better_than(&self, other: &SnappedPoint) -> bool {
        self.outranks(other, false)
    }

    /// [`is_better_than`](Self::is_better_than), optionally letting a fully
    /// constrained match (node, corner, intersection) beat a closer line or
    /// segment match anywhere within tolerance.
    pub fn outranks(&self, other: &SnappedPoint, prefer_points: bool) -> bool {
        if self.always_snap != other.always_snap {
            let (forced, ordinary) = if self.always_snap { (self, other) } else { (other, self) };
            let ordinary_wins = ordinary.distance < forced.distance
                && !approx_eq(ordinary.distance, forced.distance)
                && ordinary.target.priority() < forced.target.priority();
            return self.always_snap != ordinary_wins;
        }
        if prefer_points && self.fully_constrained != other.fully_constrained {
            return self.fully_constrained;
        }
        if !approx_eq(self.distance, other.distance) {
            return self.distance < other.distance;
        }
        let (mine, theirs) = (self.target.priority(), other.target.priority());
        if mine != theirs {
            return mine < theirs;
        }
        self.fully_constrained && !other.fully_constrained
    }
}

/// A match on a grid line or guide, kept whole for intersection tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedLine {
    pub snapped: SnappedPoint,
    pub line: Line,
}

/// A match on a finite segment (path, box edge, baseline, page border).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedSegment {
    pub snapped: SnappedPoint,
    pub segment: Segment,
}

/// Everything the snappers found for one query.
#[derive(Debug, Clone, Default)]
pub struct IntermSnapResults {
    /// Point matches, at most one per target type and dragged point.
    pub points: Vec<SnappedPoint>,
    pub curves: Vec<SnappedSegment>,
    pub grid_lines: Vec<SnappedLine>,
    pub guide_lines: Vec<SnappedLine>,
}

impl IntermSnapResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.curves.is_empty() && self.grid_lines.is_empty() && self.guide_lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.curves.len() + self.grid_lines.len() + self.guide_lines.len()
    }

    /// Record a point match, keeping only the best per target type.
    pub fn add_point(&mut self, snapped: SnappedPoint) {
        match self
            .points
            .iter_mut()
            .find(|p| p.target == snapped.target && p.source_index == snapped.source_index)
        {
            Some(existing) => {
                if snapped.is_better_than(existing) {
                    *existing = snapped;
                }
            }
            None => self.points.push(snapped),
        }
    }

    pub fn add_curve(&mut self, snapped: SnappedPoint, segment: Segment) {
        self.curves.push(SnappedSegment { snapped, segment });
    }

    pub fn add_grid_line(&mut self, snapped: SnappedPoint, line: Line) {
        self.grid_lines.push(SnappedLine { snapped, line });
    }

    pub fn add_guide_line(&mut self, snapped: SnappedPoint, line: Line) {
        self.guide_lines.push(SnappedLine { snapped, line });
    }

    /// Every match that may compete for the win, intersections included.
    ///
    /// Line intersections are only added for free snaps: a constrained snap
    /// already sits on the intersection of the constraint with its target.
    pub fn candidates(&self, p: &SnapCandidatePoint, prefs: &SnapPreferences, constrained: bool) -> Vec<SnappedPoint> {
        let mut list: Vec<SnappedPoint> = self
            .points
            .iter()
            .copied()
            .filter(|s| prefs.is_target_snappable(s.target))
            .collect();

        list.extend(
            self.curves
                .iter()
                .map(|c| c.snapped)
                .filter(|s| prefs.is_target_snappable(s.target)),
        );
        if prefs.is_target_snappable(SnapTarget::Grid) {
            list.extend(self.grid_lines.iter().map(|l| l.snapped));
        }
        list.extend(self.guide_lines.iter().map(|l| l.snapped));

        if !constrained {
            if prefs.is_target_snappable(SnapTarget::GridIntersection) {
                list.extend(line_intersections(&self.grid_lines, &self.grid_lines, p, SnapTarget::GridIntersection));
            }
            if prefs.is_target_snappable(SnapTarget::GuideIntersection) {
                list.extend(line_intersections(&self.guide_lines, &self.guide_lines, p, SnapTarget::GuideIntersection));
            }
            if prefs.is_target_snappable(SnapTarget::GridGuideIntersection) {
                list.extend(line_intersections(&self.grid_lines, &self.guide_lines, p, SnapTarget::GridGuideIntersection));
            }
            if prefs.is_target_snappable(SnapTarget::PathGuideIntersection) {
                list.extend(curve_guide_intersections(&self.curves, &self.guide_lines, p));
            }
        }
        list
    }

    /// Pick the winner for dragged point `p`.
    ///
    /// Matches outside their tolerance or outside `viewport` are ignored.
    /// With `to_paths_only` only path-lying targets may win. A grid pitch
    /// query only takes points fixed in both directions.
    pub fn find_best(
        &self,
        p: &SnapCandidatePoint,
        prefs: &SnapPreferences,
        constrained: bool,
        to_paths_only: bool,
        viewport: Option<Rect>,
    ) -> Option<SnappedPoint> {
        let prefer_points = prefs.bool(SnapOption::PreferPoints);
        let mut best: Option<SnappedPoint> = None;
        for candidate in self.candidates(p, prefs, constrained) {
            if to_paths_only && !candidate.target.is_on_path() {
                continue;
            }
            if p.source == SnapSource::GridPitch && !candidate.fully_constrained {
                continue;
            }
            if !candidate.within_tolerance() {
                continue;
            }
            if viewport.is_some_and(|area| !area.contains(candidate.point)) {
                continue;
            }
            let replace = match &best {
                Some(current) => candidate.outranks(current, prefer_points),
                None => true,
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }
}

fn line_intersections<'a>(
    first: &'a [SnappedLine],
    second: &'a [SnappedLine],
    p: &'a SnapCandidatePoint,
    target: SnapTarget,
) -> impl Iterator<Item = SnappedPoint> + 'a {
    first.iter().enumerate().flat_map(move |(i, a)| {
        second
            .iter()
            .enumerate()
            // Within one list each unordered pair once.
            .filter(move |(j, _)| !std::ptr::eq(first, second) || *j > i)
            .filter_map(move |(_, b)| {
                let point = a.line.intersect(&b.line)?;
                Some(intersection_point(point, &a.snapped, &b.snapped, p, target, None))
            })
    })
}

fn curve_guide_intersections<'a>(
    curves: &'a [SnappedSegment],
    guides: &'a [SnappedLine],
    p: &'a SnapCandidatePoint,
) -> impl Iterator<Item = SnappedPoint> + 'a {
    curves
        .iter()
        .filter(|c| c.snapped.target == SnapTarget::Path)
        .flat_map(move |c| {
            guides.iter().filter_map(move |g| {
                let point = intersect_segment_line(&c.segment, &g.line)?;
                Some(intersection_point(
                    point,
                    &c.snapped,
                    &g.snapped,
                    p,
                    SnapTarget::PathGuideIntersection,
                    c.snapped.object,
                ))
            })
        })
}

/// Tolerance and always-snap of an intersection come from the closer of the
/// two lines.
fn intersection_point(
    point: Point,
    a: &SnappedPoint,
    b: &SnappedPoint,
    p: &SnapCandidatePoint,
    target: SnapTarget,
    object: Option<ObjectId>,
) -> SnappedPoint {
    let primary = if a.distance <= b.distance { a } else { b };
    SnappedPoint {
        point,
        source: p.source,
        source_index: primary.source_index,
        target,
        distance: point.distance(p.point),
        tolerance: primary.tolerance,
        always_snap: primary.always_snap,
        constrained: false,
        fully_constrained: true,
        object,
    }
}

/// The outcome of a query: one winning match or "no snap".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub snapped: bool,
    /// Where the dragged point should go.
    pub point: Point,
    /// Where the dragged point was.
    pub original: Point,
    /// Signed displacement from `original` to `point`.
    pub offset: Vec2,
    pub distance: Coord,
    pub target: SnapTarget,
    pub source: SnapSource,
    pub source_index: usize,
    pub always_snap: bool,
    pub constrained: bool,
    pub object: Option<ObjectId>,
}

impl SnapResult {
    /// No snap; the caller keeps `point`.
    pub fn none(point: Point) -> Self {
        Self {
            snapped: false,
            point,
            original: point,
            offset: Vec2::ZERO,
            distance: 0.0,
            target: SnapTarget::Undefined,
            source: SnapSource::Undefined,
            source_index: 0,
            always_snap: false,
            constrained: false,
            object: None,
        }
    }

    /// No snap, but the point was moved onto a constraint.
    pub fn constrained_only(original: Point, projected: Point, target: SnapTarget) -> Self {
        Self {
            point: projected,
            offset: projected - original,
            distance: original.distance(projected),
            target,
            constrained: true,
            ..Self::none(original)
        }
    }

    pub fn from_snapped(snapped: &SnappedPoint, original: Point) -> Self {
        Self {
            snapped: true,
            point: snapped.point,
            original,
            offset: snapped.point - original,
            distance: snapped.distance,
            target: snapped.target,
            source: snapped.source,
            source_index: snapped.source_index,
            always_snap: snapped.always_snap,
            constrained: snapped.constrained,
            object: snapped.object,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped
    }

    /// The snapped point if there was a snap, else the original.
    pub fn point_if_snapped(&self) -> Point {
        if self.snapped {
            self.point
        } else {
            self.original
        }
    }
}
