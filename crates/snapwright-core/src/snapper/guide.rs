use crate::candidate::{SnapTarget, ToolContext};
use crate::document::Guide;
use crate::geom::{Constraint, Coord};
use crate::preferences::{SnapOption, SnapPreferences};
use crate::providers::{GuideProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{LineStrategy, Matcher, DragPoint, SnapContext, SnapStrategy, Snapper};

/// Snaps to guide lines and guide origins.
#[derive(Debug, Clone, Default)]
pub struct GuideSnapper {
    guides: Vec<Guide>,
}

impl GuideSnapper {
    pub fn new(guides: Vec<Guide>) -> Self {
        Self { guides }
    }

    fn snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, constraint: Option<&Constraint>, ctx: &SnapContext<'_>) {
        let always_snap = self.always_snap(ctx);
        let candidates = GuideProvider::new(&self.guides, ctx.exclusions).candidates(always_snap);
        let perpendicular = ctx
            .preferences
            .is_target_snappable(SnapTarget::GuidePerpendicular)
            .then_some(SnapTarget::GuidePerpendicular);
        let matcher = Matcher::new(dragged, self.tolerance(ctx), always_snap, constraint);
        LineStrategy::new(perpendicular).snap_all(isr, candidates, &matcher);
    }
}

impl Snapper for GuideSnapper {
    fn name(&self) -> &'static str {
        "guide"
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        tool != ToolContext::Navigation
            && !self.guides.is_empty()
            && prefs.is_enabled()
            && prefs.bool(SnapOption::GuideEnabled)
    }

    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
        ctx.tolerance(SnapOption::GuideTolerance)
    }

    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
        ctx.is_always_snap(SnapOption::GuideAlwaysSnap, SnapOption::GuideTolerance)
    }

    fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, _cache: &mut SnapCache) {
        self.snap(isr, dragged, None, ctx);
    }

    fn constrained_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        ctx: &SnapContext<'_>,
        _cache: &mut SnapCache,
    ) {
        self.snap(isr, &dragged.projected(constraint), Some(constraint), ctx);
    }
}
