use crate::candidate::ToolContext;
use crate::document::Page;
use crate::geom::{Constraint, Coord};
use crate::preferences::{SnapOption, SnapPreferences};
use crate::providers::{PageProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{Matcher, PointStrategy, DragPoint, SnapContext, SnapStrategy, Snapper};

/// Snaps to page corners and borders. Uses the object tolerance.
#[derive(Debug, Clone, Default)]
pub struct PageSnapper {
    pages: Vec<Page>,
}

impl PageSnapper {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    fn snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, constraint: Option<&Constraint>, ctx: &SnapContext<'_>) {
        let candidates = PageProvider::new(&self.pages, ctx.exclusions).candidates();
        let matcher = Matcher::new(dragged, self.tolerance(ctx), self.always_snap(ctx), constraint);
        PointStrategy.snap_all(isr, candidates, &matcher);
    }
}

impl Snapper for PageSnapper {
    fn name(&self) -> &'static str {
        "page"
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        tool != ToolContext::Navigation
            && !self.pages.is_empty()
            && prefs.is_enabled()
            && prefs.bool(SnapOption::PageBorder)
    }

    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
        ctx.tolerance(SnapOption::ObjectTolerance)
    }

    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
        ctx.is_always_snap(SnapOption::ObjectAlwaysSnap, SnapOption::ObjectTolerance)
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

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    #[test]
    fn test_page_interest_follows_toggle() {
        let mut prefs = SnapPreferences::new();
        let snapper = PageSnapper::new(vec![Page {
            id: uuid::Uuid::new_v4(),
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
        }]);
        assert!(snapper.is_interested(&prefs, ToolContext::PageEditor));
        prefs.set_bool(SnapOption::PageBorder, false);
        assert!(!snapper.is_interested(&prefs, ToolContext::PageEditor));
    }
}
