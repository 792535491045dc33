//! Category snappers.
//!
//! Every snapper implements [`Snapper`]: a cheap interest check, a
//! tolerance, and the actual free or constrained search that feeds an
//! [`IntermSnapResults`]. How candidates become matches is left to one of
//! two strategies: [`PointStrategy`] for point and segment targets (objects,
//! pages) and [`LineStrategy`] for infinite lines (grids, guides). Alignment
//! and distribution place the point relative to other objects' bounding
//! boxes and do their own matching.
//!
//! The set of snappers is closed; [`SnapperKind`] dispatches over it.

mod alignment;
mod distribution;
mod grid;
mod guide;
mod line;
mod object;
mod page;
mod point;

pub use alignment::AlignmentSnapper;
pub use distribution::DistributionSnapper;
pub use grid::{AxonometricGridSnapper, GridSnapper};
pub use guide::GuideSnapper;
pub use line::LineStrategy;
pub use object::ObjectSnapper;
pub use page::PageSnapper;
pub use point::PointStrategy;

use kurbo::Point;

use crate::candidate::{ExclusionSet, SnapCandidate, SnapCandidatePoint, SnapTarget, SnapperQuery, ToolContext};
use crate::document::{CanvasLayout, DocumentModel, ObjectId};
use crate::geom::{Constraint, Coord};
use crate::preferences::{SnapOption, SnapPreferences, ALWAYS_SNAP_TOLERANCE};
use crate::providers::SnapCache;
use crate::results::{IntermSnapResults, SnappedPoint};
use crate::view::SnapView;

/// Everything a snapper may read during one query.
pub struct SnapContext<'a> {
    pub document: &'a dyn DocumentModel,
    pub layout: &'a dyn CanvasLayout,
    pub preferences: &'a SnapPreferences,
    pub view: &'a SnapView,
    pub exclusions: &'a ExclusionSet,
    pub query: &'a SnapperQuery,
}

impl SnapContext<'_> {
    /// Tolerance option converted from screen pixels to document units.
    pub fn tolerance(&self, option: SnapOption) -> Coord {
        self.view.to_document_length(self.preferences.number(option))
    }

    /// A tolerance at or above [`ALWAYS_SNAP_TOLERANCE`] pixels means always snap.
    pub fn is_always_snap(&self, flag: SnapOption, tolerance: SnapOption) -> bool {
        self.preferences.bool(flag) || self.preferences.number(tolerance) >= ALWAYS_SNAP_TOLERANCE
    }
}

/// One dragged point as seen by the snappers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPoint {
    /// Position of the point in the query.
    pub index: usize,
    pub point: SnapCandidatePoint,
}

impl DragPoint {
    pub fn new(index: usize, point: SnapCandidatePoint) -> Self {
        Self { index, point }
    }

    /// The same point moved onto `constraint`.
    pub fn projected(&self, constraint: &Constraint) -> Self {
        let mut point = self.point;
        point.point = constraint.project(point.point);
        Self { point, ..*self }
    }
}

/// Turns candidates into matches for a single dragged point.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    pub dragged: &'a DragPoint,
    pub tolerance: Coord,
    pub always_snap: bool,
    pub constraint: Option<&'a Constraint>,
}

impl<'a> Matcher<'a> {
    pub fn new(dragged: &'a DragPoint, tolerance: Coord, always_snap: bool, constraint: Option<&'a Constraint>) -> Self {
        Self {
            dragged,
            tolerance,
            always_snap,
            constraint,
        }
    }

    /// A match at `point` for `candidate`, or `None` when out of tolerance.
    pub fn matched(&self, point: Point, candidate: &SnapCandidate, fully_constrained: bool) -> Option<SnappedPoint> {
        self.matched_as(point, candidate.target, candidate.object, candidate.always_snap, fully_constrained)
    }

    pub fn matched_as(
        &self,
        point: Point,
        target: SnapTarget,
        object: Option<ObjectId>,
        candidate_always: bool,
        fully_constrained: bool,
    ) -> Option<SnappedPoint> {
        let always_snap = self.always_snap || candidate_always;
        let tolerance = if always_snap { Coord::INFINITY } else { self.tolerance };
        let distance = point.distance(self.dragged.point.point);
        if distance > tolerance {
            return None;
        }
        Some(SnappedPoint {
            point,
            source: self.dragged.point.source,
            source_index: self.dragged.index,
            target,
            distance,
            tolerance,
            always_snap,
            constrained: self.constraint.is_some(),
            fully_constrained: fully_constrained || self.constraint.is_some(),
            object,
        })
    }
}

/// How a snapper turns one candidate into zero or more matches.
pub trait SnapStrategy {
    fn snap_candidate(&self, isr: &mut IntermSnapResults, candidate: &SnapCandidate, matcher: &Matcher<'_>);

    fn snap_all(
        &self,
        isr: &mut IntermSnapResults,
        candidates: impl IntoIterator<Item = SnapCandidate>,
        matcher: &Matcher<'_>,
    ) where
        Self: Sized,
    {
        for candidate in candidates {
            self.snap_candidate(isr, &candidate, matcher);
        }
    }
}

/// Common capability of all category snappers.
pub trait Snapper {
    fn name(&self) -> &'static str;

    /// Cheap check run before any candidate is produced.
    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool;

    /// Tolerance in document units.
    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord;

    /// Whether this snapper ignores its tolerance.
    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool;

    fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, cache: &mut SnapCache);

    /// Search along `constraint`; only matches lying on it are recorded.
    fn constrained_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        ctx: &SnapContext<'_>,
        cache: &mut SnapCache,
    );

    fn find_best_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: Option<&Constraint>,
        ctx: &SnapContext<'_>,
        cache: &mut SnapCache,
    ) {
        match constraint {
            Some(constraint) => self.constrained_snap(isr, dragged, constraint, ctx, cache),
            None => self.free_snap(isr, dragged, ctx, cache),
        }
    }
}

/// The closed set of snappers.
#[derive(Debug, Clone)]
pub enum SnapperKind {
    Object(ObjectSnapper),
    Grid(GridSnapper),
    AxonometricGrid(AxonometricGridSnapper),
    Guide(GuideSnapper),
    Page(PageSnapper),
    Alignment(AlignmentSnapper),
    Distribution(DistributionSnapper),
}

impl SnapperKind {
    /// Snappers for everything the layout currently shows, objects first.
    ///
    /// Alignment and distribution come last and are always present; their
    /// preferences decide whether they take part.
    pub fn for_layout(layout: &dyn CanvasLayout) -> Vec<SnapperKind> {
        let mut snappers = vec![SnapperKind::Object(ObjectSnapper)];
        snappers.extend(Self::grids(layout));
        let guides = layout.active_guides();
        if !guides.is_empty() {
            snappers.push(SnapperKind::Guide(GuideSnapper::new(guides)));
        }
        let pages = layout.page_rects();
        if !pages.is_empty() {
            snappers.push(SnapperKind::Page(PageSnapper::new(pages.clone())));
        }
        snappers.push(SnapperKind::Alignment(AlignmentSnapper::new(pages)));
        snappers.push(SnapperKind::Distribution(DistributionSnapper));
        snappers
    }

    /// One snapper per active grid, indexed by position in the layout.
    pub fn grids(layout: &dyn CanvasLayout) -> Vec<SnapperKind> {
        layout
            .active_grids()
            .into_iter()
            .enumerate()
            .map(|(index, grid)| {
                if grid.is_axonometric() {
                    SnapperKind::AxonometricGrid(AxonometricGridSnapper::new(index, grid))
                } else {
                    SnapperKind::Grid(GridSnapper::new(index, grid))
                }
            })
            .collect()
    }

    fn inner(&self) -> &dyn Snapper {
        match self {
            SnapperKind::Object(s) => s,
            SnapperKind::Grid(s) => s,
            SnapperKind::AxonometricGrid(s) => s,
            SnapperKind::Guide(s) => s,
            SnapperKind::Page(s) => s,
            SnapperKind::Alignment(s) => s,
            SnapperKind::Distribution(s) => s,
        }
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, SnapperKind::Grid(_) | SnapperKind::AxonometricGrid(_))
    }

    /// Origin of the grid behind a grid snapper.
    pub fn grid_origin(&self) -> Option<Point> {
        match self {
            SnapperKind::Grid(s) => Some(s.config().origin),
            SnapperKind::AxonometricGrid(s) => Some(s.config().origin),
            _ => None,
        }
    }
}

impl Snapper for SnapperKind {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        self.inner().is_interested(prefs, tool)
    }

    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
        self.inner().tolerance(ctx)
    }

    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
        self.inner().always_snap(ctx)
    }

    fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, cache: &mut SnapCache) {
        self.inner().free_snap(isr, dragged, ctx, cache)
    }

    fn constrained_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        ctx: &SnapContext<'_>,
        cache: &mut SnapCache,
    ) {
        self.inner().constrained_snap(isr, dragged, constraint, ctx, cache)
    }

    fn find_best_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: Option<&Constraint>,
        ctx: &SnapContext<'_>,
        cache: &mut SnapCache,
    ) {
        self.inner().find_best_snap(isr, dragged, constraint, ctx, cache)
    }
}
