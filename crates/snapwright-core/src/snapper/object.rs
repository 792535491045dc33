use kurbo::Rect;

use crate::candidate::ToolContext;
use crate::geom::{Constraint, Coord};
use crate::preferences::{SnapOption, SnapPreferences};
use crate::providers::{IntersectionScope, ObjectProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{Matcher, PointStrategy, DragPoint, SnapContext, SnapStrategy, Snapper};

/// Path intersections are only searched for queries with this many points or fewer.
const MAX_INTERSECTION_POINTS: usize = 2;

/// Snaps to nodes, bounding boxes, paths and text of document objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSnapper;

impl ObjectSnapper {
    fn snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, constraint: Option<&Constraint>, ctx: &SnapContext<'_>) {
        let tolerance = self.tolerance(ctx);
        let always_snap = self.always_snap(ctx);
        let always_intersections = ctx.preferences.bool(SnapOption::AlwaysSnapIntersections);
        let p = dragged.point.point;

        let area = if always_snap || always_intersections {
            ctx.view.visible_area().union_pt(p)
        } else {
            Rect::from_points(p, p).inflate(tolerance, tolerance)
        };
        let scope = intersection_scope(ctx, dragged, tolerance, always_snap || always_intersections);

        let provider = ObjectProvider::new(ctx.document, ctx.exclusions, ctx.preferences);
        let matcher = Matcher::new(dragged, tolerance, always_snap, constraint);
        PointStrategy.snap_all(isr, provider.candidates(area, &scope, always_intersections), &matcher);
    }
}

fn intersection_scope(ctx: &SnapContext<'_>, dragged: &DragPoint, tolerance: Coord, everywhere: bool) -> IntersectionScope {
    if ctx.query.points.len() > MAX_INTERSECTION_POINTS {
        IntersectionScope::Off
    } else if everywhere {
        IntersectionScope::Everywhere
    } else {
        IntersectionScope::Near {
            points: vec![dragged.point.point],
            radius: tolerance,
        }
    }
}

impl Snapper for ObjectSnapper {
    fn name(&self) -> &'static str {
        "object"
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        if matches!(tool, ToolContext::Navigation | ToolContext::PageEditor) || !prefs.is_enabled() {
            return false;
        }
        prefs.bool(SnapOption::BBoxEnabled) || prefs.bool(SnapOption::NodesEnabled) || prefs.bool(SnapOption::OthersEnabled)
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
    use crate::candidate::{ExclusionSet, SnapCandidatePoint, SnapSource, SnapTarget, SnapperQuery};
    use crate::document::{MemoryDocument, ObjectGeometry};
    use crate::geom::Line;
    use crate::view::SnapView;
    use kurbo::Point;

    fn run(doc: &MemoryDocument, prefs: &SnapPreferences, p: Point, constraint: Option<&Constraint>) -> IntermSnapResults {
        let query = SnapperQuery::point(p);
        let exclusions = ExclusionSet::default();
        let view = SnapView::new();
        let ctx = SnapContext {
            document: doc,
            layout: doc,
            preferences: prefs,
            view: &view,
            exclusions: &exclusions,
            query: &query,
        };
        let dragged = DragPoint::new(0, SnapCandidatePoint::new(p, SnapSource::NodeCusp));
        let mut isr = IntermSnapResults::new();
        ObjectSnapper.find_best_snap(&mut isr, &dragged, constraint, &ctx, &mut SnapCache::new());
        isr
    }

    #[test]
    fn test_interest_by_tool() {
        let prefs = SnapPreferences::new();
        assert!(ObjectSnapper.is_interested(&prefs, ToolContext::Selector));
        assert!(!ObjectSnapper.is_interested(&prefs, ToolContext::PageEditor));
        assert!(!ObjectSnapper.is_interested(&prefs, ToolContext::Navigation));
    }

    #[test]
    fn test_finds_nearby_node() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let prefs = SnapPreferences::new();
        let isr = run(&doc, &prefs, Point::new(10.5, 10.5), None);
        assert!(isr.points.iter().any(|p| p.target == SnapTarget::NodeCusp));
        assert!(run(&doc, &prefs, Point::new(30.0, 30.0), None).is_empty());
    }

    #[test]
    fn test_constrained_to_edge_crossing() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let prefs = SnapPreferences::new();
        let constraint = Constraint::from(Line::horizontal(5.0));
        let isr = run(&doc, &prefs, Point::new(9.0, 6.0), Some(&constraint));
        let hit = isr.curves.iter().find(|c| c.snapped.target == SnapTarget::BBoxEdge).unwrap();
        assert_eq!(hit.snapped.point, Point::new(10.0, 5.0));
        assert!(hit.snapped.constrained);
    }
}
