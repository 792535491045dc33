//! Point and segment matching, used by the object and page snappers.

use kurbo::Point;

use crate::candidate::{CandidateGeometry, SnapCandidate};
use crate::geom::{nearest_on_segment, nearest_to, Segment};
use crate::results::IntermSnapResults;

use super::{Matcher, SnapStrategy};

/// Free nearest-point search over point and segment targets.
///
/// Point targets are fully constrained. Segment targets only fix the
/// distance to the segment, unless a constraint crosses them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointStrategy;

impl PointStrategy {
    /// Record a point target. Along a constraint it must lie on it.
    pub fn snap_point(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, point: Point, m: &Matcher<'_>) {
        if m.constraint.is_some_and(|constraint| !constraint.contains(point)) {
            return;
        }
        if let Some(snapped) = m.matched(point, candidate, true) {
            isr.add_point(snapped);
        }
    }

    /// Record a segment target: the nearest point freely, the nearest
    /// crossing with the constraint otherwise.
    pub fn snap_segment(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, segment: Segment, m: &Matcher<'_>) {
        let (point, fully_constrained) = match m.constraint {
            Some(constraint) => match nearest_to(constraint.crossings_with_segment(&segment), m.dragged.point.point) {
                Some(point) => (point, true),
                None => return,
            },
            None => (nearest_on_segment(m.dragged.point.point, &segment), false),
        };
        if let Some(snapped) = m.matched(point, candidate, fully_constrained) {
            isr.add_curve(snapped, segment);
        }
    }
}

impl SnapStrategy for PointStrategy {
    fn snap_candidate(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, matcher: &Matcher<'_>) {
        match candidate.geometry {
            CandidateGeometry::Point(point) => self.snap_point(isr, candidate, point, matcher),
            CandidateGeometry::Segment(segment) => self.snap_segment(isr, candidate, segment, matcher),
            // Infinite lines are handled by the line strategy
            CandidateGeometry::Line(_) => {}
        }
    }
}
