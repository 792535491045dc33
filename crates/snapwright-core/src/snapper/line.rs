//! Infinite line matching, used by the grid and guide snappers.
//!
//! Free snaps project onto each line and keep the line itself so the
//! results can later intersect it with other lines. Constrained snaps only
//! keep the crossing of each line with the constraint.

use kurbo::Point;

use crate::candidate::{CandidateGeometry, SnapCandidate, SnapTarget};
use crate::geom::{nearest_to, Line};
use crate::results::{IntermSnapResults, SnappedPoint};

use super::{Matcher, PointStrategy, SnapStrategy};

/// Line search for grids and guides.
#[derive(Debug, Clone, Copy)]
pub struct LineStrategy {
    /// Target reported for the foot of a perpendicular, if enabled.
    pub perpendicular: Option<SnapTarget>,
}

impl LineStrategy {
    pub fn new(perpendicular: Option<SnapTarget>) -> Self {
        Self { perpendicular }
    }

    fn snap_line(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, line: &Line, m: &Matcher<'_>) {
        match m.constraint {
            Some(constraint) => {
                // Parallel lines never meet a straight constraint
                let Some(point) = nearest_to(constraint.crossings_with_line(line), m.dragged.point.point) else {
                    return;
                };
                if let Some(snapped) = m.matched(point, candidate, true) {
                    isr.add_point(snapped);
                }
            }
            None => {
                let p = m.dragged.point.point;
                if let Some(snapped) = m.matched(line.project(p), candidate, false) {
                    record_line(isr, snapped, *line);
                }
                if let (Some(target), Some(origin)) = (self.perpendicular, m.dragged.point.origin) {
                    self.snap_perpendicular(isr, candidate, line, origin, target, m);
                }
            }
        }
    }

    /// Foot of the perpendicular dropped from the segment origin.
    fn snap_perpendicular(
        &self,
        isr: &mut IntermSnapResults,
        candidate: &SnapCandidate,
        line: &Line,
        origin: Point,
        target: SnapTarget,
        m: &Matcher<'_>,
    ) {
        let foot = line.project(origin);
        if let Some(snapped) = m.matched_as(foot, target, candidate.object, candidate.always_snap, true) {
            isr.add_point(snapped);
        }
    }
}

fn record_line(isr: &mut IntermSnapResults, snapped: SnappedPoint, line: Line) {
    match snapped.target {
        SnapTarget::Guide => isr.add_guide_line(snapped, line),
        _ => isr.add_grid_line(snapped, line),
    }
}

impl SnapStrategy for LineStrategy {
    fn snap_candidate(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, matcher: &Matcher<'_>) {
        match candidate.geometry {
            CandidateGeometry::Line(line) => self.snap_line(isr, candidate, &line, matcher),
            // Guide origins
            CandidateGeometry::Point(point) => PointStrategy.snap_point(isr, candidate, point, matcher),
            CandidateGeometry::Segment(segment) => PointStrategy.snap_segment(isr, candidate, segment, matcher),
        }
    }
}
