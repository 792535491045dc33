//! Alignment snapping.
//!
//! The dragged point lines up horizontally or vertically with a bounding box
//! corner or centre of another object, or with a page corner or centre. When
//! it lines up along both axes at once the crossing of the two alignment
//! lines is offered instead.

use std::f64::consts::SQRT_2;

use kurbo::{Point, Rect};

use crate::candidate::{SnapSource, SnapTarget, ToolContext};
use crate::document::{ObjectId, Page};
use crate::geom::{nearest_to, rect_corners, Constraint, Coord, Line};
use crate::preferences::{SnapOption, SnapPreferences, ALWAYS_SNAP_TOLERANCE};
use crate::providers::{ObjectProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{DragPoint, Matcher, SnapContext, Snapper};

/// A point others may line up with.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AlignTarget {
    point: Point,
    target: SnapTarget,
    object: Option<ObjectId>,
}

/// Where the dragged point would sit to line up with `with`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aligned {
    point: Point,
    with: AlignTarget,
}

impl Aligned {
    /// Distance along the alignment line to the point lined up with.
    fn reach(&self) -> Coord {
        self.point.distance(self.with.point)
    }

    /// Keep whichever lines up with the nearer target. Ties keep `current`.
    fn nearer(current: Option<Self>, candidate: Self) -> Option<Self> {
        match current {
            Some(current) if current.reach() <= candidate.reach() => Some(current),
            _ => Some(candidate),
        }
    }
}

/// Snaps bounding box and node sources into line with other objects and pages.
#[derive(Debug, Clone, Default)]
pub struct AlignmentSnapper {
    pages: Vec<Page>,
}

impl AlignmentSnapper {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    fn targets(&self, ctx: &SnapContext<'_>, area: Rect) -> Vec<AlignTarget> {
        let mut targets = Vec::new();
        if ctx.preferences.is_target_snappable(SnapTarget::AlignmentPageCorner) {
            for page in self.pages.iter().filter(|page| !ctx.exclusions.contains(page.id)) {
                let object = Some(page.id);
                targets.extend(rect_corners(page.rect).into_iter().map(|point| AlignTarget {
                    point,
                    target: SnapTarget::AlignmentPageCorner,
                    object,
                }));
                targets.push(AlignTarget {
                    point: page.rect.center(),
                    target: SnapTarget::AlignmentPageCenter,
                    object,
                });
            }
        }

        let provider = ObjectProvider::new(ctx.document, ctx.exclusions, ctx.preferences);
        for (id, geometry) in provider.objects(area) {
            let Some(bbox) = geometry.bbox.or_else(|| geometry.bounds()) else {
                continue;
            };
            let object = Some(id);
            targets.extend(rect_corners(bbox).into_iter().map(|point| AlignTarget {
                point,
                target: SnapTarget::AlignmentBBoxCorner,
                object,
            }));
            targets.push(AlignTarget {
                point: bbox.center(),
                target: SnapTarget::AlignmentBBoxMidpoint,
                object,
            });
        }
        targets
    }

    fn free(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, targets: &[AlignTarget], ctx: &SnapContext<'_>) {
        let tolerance = self.tolerance(ctx);
        let always_snap = self.always_snap(ctx);
        let reach = if always_snap { Coord::INFINITY } else { tolerance };
        let p = dragged.point.point;

        // Among the targets within reach of each axis, line up with the nearest one
        let mut row: Option<Aligned> = None;
        let mut column: Option<Aligned> = None;
        for &with in targets {
            if (p.y - with.point.y).abs() <= reach {
                row = Aligned::nearer(row, Aligned {
                    point: Point::new(p.x, with.point.y),
                    with,
                });
            }
            if (p.x - with.point.x).abs() <= reach {
                column = Aligned::nearer(column, Aligned {
                    point: Point::new(with.point.x, p.y),
                    with,
                });
            }
        }

        let matcher = Matcher::new(dragged, tolerance, always_snap, None);
        if let (Some(row), Some(column)) = (row, column) {
            let crossing = Matcher {
                tolerance: tolerance * SQRT_2,
                ..matcher
            };
            let point = Point::new(column.point.x, row.point.y);
            if let Some(snapped) = crossing.matched_as(point, SnapTarget::AlignmentIntersection, row.with.object, false, true) {
                isr.add_point(snapped);
                return;
            }
        }

        let nearest = [row, column]
            .into_iter()
            .flatten()
            .min_by(|a, b| a.point.distance(p).total_cmp(&b.point.distance(p)));
        if let Some(aligned) = nearest {
            if let Some(snapped) = matcher.matched_as(aligned.point, aligned.with.target, aligned.with.object, false, false) {
                isr.add_point(snapped);
            }
        }
    }

    fn constrained(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        targets: &[AlignTarget],
        ctx: &SnapContext<'_>,
    ) {
        let matcher = Matcher::new(dragged, self.tolerance(ctx), self.always_snap(ctx), Some(constraint));
        let p = dragged.point.point;
        for with in targets {
            let lines = [Line::horizontal(with.point.y), Line::vertical(with.point.x)];
            for line in &lines {
                let Some(point) = nearest_to(constraint.crossings_with_line(line), p) else {
                    continue;
                };
                if let Some(snapped) = matcher.matched_as(point, with.target, with.object, false, true) {
                    isr.add_point(snapped);
                }
            }
        }
    }
}

/// Only points of the selection's bounding box and path nodes line up.
fn aligns(source: SnapSource) -> bool {
    source.is_bbox() || source.is_node()
}

impl Snapper for AlignmentSnapper {
    fn name(&self) -> &'static str {
        "alignment"
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        !matches!(tool, ToolContext::Navigation | ToolContext::PageEditor)
            && prefs.is_enabled()
            && prefs.bool(SnapOption::AlignmentEnabled)
    }

    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
        ctx.tolerance(SnapOption::AlignmentTolerance)
    }

    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
        ctx.preferences.number(SnapOption::AlignmentTolerance) >= ALWAYS_SNAP_TOLERANCE
    }

    fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, _cache: &mut SnapCache) {
        if !aligns(dragged.point.source) {
            return;
        }
        let targets = self.targets(ctx, ctx.view.visible_area().union_pt(dragged.point.point));
        self.free(isr, dragged, &targets, ctx);
    }

    fn constrained_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        ctx: &SnapContext<'_>,
        _cache: &mut SnapCache,
    ) {
        if !aligns(dragged.point.source) {
            return;
        }
        let dragged = dragged.projected(constraint);
        let targets = self.targets(ctx, ctx.view.visible_area().union_pt(dragged.point.point));
        self.constrained(isr, &dragged, constraint, &targets, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ExclusionSet, SnapCandidatePoint, SnapperQuery};
    use crate::document::{MemoryDocument, ObjectGeometry};
    use crate::view::SnapView;

    fn alignment_prefs() -> SnapPreferences {
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::AlignmentEnabled, true);
        prefs
    }

    fn run(
        snapper: &AlignmentSnapper,
        doc: &MemoryDocument,
        p: Point,
        source: SnapSource,
        constraint: Option<&Constraint>,
    ) -> IntermSnapResults {
        let prefs = alignment_prefs();
        let query = SnapperQuery::point(p).source(source);
        let exclusions = ExclusionSet::default();
        let view = SnapView::new();
        let ctx = SnapContext {
            document: doc,
            layout: doc,
            preferences: &prefs,
            view: &view,
            exclusions: &exclusions,
            query: &query,
        };
        let dragged = DragPoint::new(0, SnapCandidatePoint::new(p, source));
        let mut isr = IntermSnapResults::new();
        snapper.find_best_snap(&mut isr, &dragged, constraint, &ctx, &mut SnapCache::new());
        isr
    }

    #[test]
    fn test_alignment_is_opt_in() {
        let snapper = AlignmentSnapper::default();
        assert!(!snapper.is_interested(&SnapPreferences::new(), ToolContext::Selector));
        assert!(snapper.is_interested(&alignment_prefs(), ToolContext::Selector));
        assert!(!snapper.is_interested(&alignment_prefs(), ToolContext::Navigation));
    }

    #[test]
    fn test_lines_up_with_nearest_corner_row() {
        let mut doc = MemoryDocument::new();
        let id = doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));

        let isr = run(&AlignmentSnapper::default(), &doc, Point::new(30.0, 10.3), SnapSource::BBoxCorner, None);
        assert_eq!(isr.points.len(), 1);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::AlignmentBBoxCorner);
        assert_eq!(hit.point, Point::new(30.0, 10.0));
        assert_eq!(hit.object, Some(id));
        assert!(!hit.fully_constrained);
        assert!((hit.distance - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_both_axes_give_intersection() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        // Only its centre x = 30 is within reach of the dragged column
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(20.0, 40.0, 40.0, 44.0)));

        let isr = run(&AlignmentSnapper::default(), &doc, Point::new(30.4, 10.3), SnapSource::BBoxCorner, None);
        assert_eq!(isr.points.len(), 1);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::AlignmentIntersection);
        assert!((hit.point - Point::new(30.0, 10.0)).hypot() < 1e-9);
        assert!(hit.fully_constrained);
    }

    #[test]
    fn test_page_corners_and_center() {
        let doc = MemoryDocument::new();
        let page = Page {
            id: uuid::Uuid::new_v4(),
            rect: Rect::new(0.0, 0.0, 100.0, 60.0),
        };
        let snapper = AlignmentSnapper::new(vec![page]);

        let isr = run(&snapper, &doc, Point::new(150.0, 31.0), SnapSource::BBoxMidpoint, None);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::AlignmentPageCenter);
        assert_eq!(hit.point, Point::new(150.0, 30.0));
        assert_eq!(hit.object, Some(page.id));
    }

    #[test]
    fn test_constrained_alignment_stays_on_line() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let constraint = Constraint::from(Line::vertical(30.4));

        let isr = run(&AlignmentSnapper::default(), &doc, Point::new(30.4, 10.3), SnapSource::NodeCusp, Some(&constraint));
        assert!(!isr.points.is_empty());
        assert!(isr.points.iter().all(|s| s.constrained && (s.point.x - 30.4).abs() < 1e-9));
        assert!(isr.points.iter().any(|s| (s.point.y - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_other_sources_do_not_align() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let isr = run(&AlignmentSnapper::default(), &doc, Point::new(30.0, 10.3), SnapSource::GuideOrigin, None);
        assert!(isr.is_empty());
    }
}
