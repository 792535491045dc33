//! Distribution snapping.
//!
//! A dragged selection snaps so that the gap to its nearest neighbour on one
//! side equals the gap between that neighbour and the next one, or so that
//! it sits centred between its nearest neighbours on opposite sides. Only
//! the midpoint of the selection's bounding box is snapped this way.

use std::f64::consts::SQRT_2;

use kurbo::{Point, Rect, Vec2};

use crate::candidate::{SnapSource, SnapTarget, ToolContext};
use crate::geom::{nearest_to, rects_overlap, Constraint, Coord, Line};
use crate::preferences::{SnapOption, SnapPreferences, ALWAYS_SNAP_TOLERANCE};
use crate::providers::{ObjectProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{DragPoint, Matcher, SnapContext, Snapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    /// Free space between `inner` and `outer`, which lies beyond it on this side.
    fn gap(self, inner: Rect, outer: Rect) -> Coord {
        match self {
            Side::Right => outer.x0 - inner.x1,
            Side::Left => inner.x0 - outer.x1,
            Side::Down => outer.y0 - inner.y1,
            Side::Up => inner.y0 - outer.y1,
        }
    }

    /// Unit move towards this side.
    fn step(self) -> Vec2 {
        match self {
            Side::Right => Vec2::new(1.0, 0.0),
            Side::Left => Vec2::new(-1.0, 0.0),
            Side::Down => Vec2::new(0.0, 1.0),
            Side::Up => Vec2::new(0.0, -1.0),
        }
    }

    fn target(self) -> SnapTarget {
        match self {
            Side::Right => SnapTarget::DistributionRight,
            Side::Left => SnapTarget::DistributionLeft,
            Side::Down => SnapTarget::DistributionDown,
            Side::Up => SnapTarget::DistributionUp,
        }
    }
}

/// Bounding boxes beside the selection, nearest first on each side.
///
/// A box counts as left or right when it shares part of the selection's
/// vertical extent, and as above or below when it shares part of its
/// horizontal extent. Boxes touching the selection are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
struct Neighbours {
    left: Vec<Rect>,
    right: Vec<Rect>,
    up: Vec<Rect>,
    down: Vec<Rect>,
}

impl Neighbours {
    fn collect(selection: Rect, boxes: impl IntoIterator<Item = Rect>) -> Self {
        let mut neighbours = Self::default();
        let center = selection.center();
        for bbox in boxes {
            if rects_overlap(bbox, selection) {
                continue;
            }
            let offset = bbox.center() - center;
            if bbox.y0 <= selection.y1 && selection.y0 <= bbox.y1 {
                if offset.x > 0.0 {
                    neighbours.right.push(bbox);
                } else {
                    neighbours.left.push(bbox);
                }
            } else if bbox.x0 <= selection.x1 && selection.x0 <= bbox.x1 {
                if offset.y > 0.0 {
                    neighbours.down.push(bbox);
                } else {
                    neighbours.up.push(bbox);
                }
            }
        }
        neighbours.right.sort_by(|a, b| a.center().x.total_cmp(&b.center().x));
        neighbours.left.sort_by(|a, b| b.center().x.total_cmp(&a.center().x));
        neighbours.down.sort_by(|a, b| a.center().y.total_cmp(&b.center().y));
        neighbours.up.sort_by(|a, b| b.center().y.total_cmp(&a.center().y));
        neighbours
    }

    fn side(&self, side: Side) -> &[Rect] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
            Side::Up => &self.up,
            Side::Down => &self.down,
        }
    }

    /// Move giving `selection` the gap its two nearest neighbours on `side` keep.
    fn equal_gap(&self, selection: Rect, side: Side) -> Option<(Vec2, SnapTarget)> {
        let [near, far, ..] = self.side(side) else {
            return None;
        };
        let gap = side.gap(*near, *far);
        if gap < 0.0 {
            return None;
        }
        Some((side.step() * (side.gap(selection, *near) - gap), side.target()))
    }

    /// Move centring `selection` between its nearest neighbours on each side of an axis.
    fn centred(&self, selection: Rect, horizontal: bool) -> Option<(Vec2, SnapTarget)> {
        let center = selection.center();
        if horizontal {
            let (left, right) = (self.left.first()?, self.right.first()?);
            let x = (left.x1 + right.x0) / 2.0;
            Some((Vec2::new(x - center.x, 0.0), SnapTarget::DistributionX))
        } else {
            let (up, down) = (self.up.first()?, self.down.first()?);
            let y = (up.y1 + down.y0) / 2.0;
            Some((Vec2::new(0.0, y - center.y), SnapTarget::DistributionY))
        }
    }

    /// The smallest move that distributes `selection` along one axis.
    fn best_move(&self, selection: Rect, horizontal: bool) -> Option<(Vec2, SnapTarget)> {
        let sides = if horizontal {
            [Side::Right, Side::Left]
        } else {
            [Side::Up, Side::Down]
        };
        sides
            .into_iter()
            .filter_map(|side| self.equal_gap(selection, side))
            .chain(self.centred(selection, horizontal))
            .min_by(|a, b| a.0.hypot().total_cmp(&b.0.hypot()))
    }
}

/// Snaps the selection midpoint to equal spacing with neighbouring objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionSnapper;

impl DistributionSnapper {
    /// The selection's box centred on the dragged point, and its neighbours.
    fn neighbours(&self, dragged: &DragPoint, ctx: &SnapContext<'_>) -> Option<(Rect, Neighbours)> {
        if dragged.point.source != SnapSource::BBoxMidpoint {
            return None;
        }
        let p = dragged.point.point;
        let bbox = ctx.query.dragged_bbox()?;
        let selection = bbox + (p - bbox.center());

        let area = ctx.view.visible_area().union(selection);
        let provider = ObjectProvider::new(ctx.document, ctx.exclusions, ctx.preferences);
        let boxes = provider
            .objects(area)
            .into_iter()
            .filter_map(|(_, geometry)| geometry.bbox.or_else(|| geometry.bounds()));
        Some((selection, Neighbours::collect(selection, boxes)))
    }
}

impl Snapper for DistributionSnapper {
    fn name(&self) -> &'static str {
        "distribution"
    }

    fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
        !matches!(tool, ToolContext::Navigation | ToolContext::PageEditor)
            && prefs.is_enabled()
            && prefs.bool(SnapOption::DistributionEnabled)
    }

    fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
        ctx.tolerance(SnapOption::DistributionTolerance)
    }

    fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
        ctx.preferences.number(SnapOption::DistributionTolerance) >= ALWAYS_SNAP_TOLERANCE
    }

    fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, _cache: &mut SnapCache) {
        let Some((selection, neighbours)) = self.neighbours(dragged, ctx) else {
            return;
        };
        let p = dragged.point.point;
        let along_x = neighbours.best_move(selection, true);
        let along_y = neighbours.best_move(selection, false);
        let matcher = Matcher::new(dragged, self.tolerance(ctx), self.always_snap(ctx), None);

        if let (Some((x, _)), Some((y, _))) = (along_x, along_y) {
            let both = Matcher {
                tolerance: matcher.tolerance * SQRT_2,
                ..matcher
            };
            if let Some(snapped) = both.matched_as(p + x + y, SnapTarget::DistributionXY, None, false, true) {
                isr.add_point(snapped);
                return;
            }
        }
        for (shift, target) in [along_x, along_y].into_iter().flatten() {
            if let Some(snapped) = matcher.matched_as(p + shift, target, None, false, false) {
                isr.add_point(snapped);
            }
        }
    }

    fn constrained_snap(
        &self,
        isr: &mut IntermSnapResults,
        dragged: &DragPoint,
        constraint: &Constraint,
        ctx: &SnapContext<'_>,
        _cache: &mut SnapCache,
    ) {
        let dragged = dragged.projected(constraint);
        let Some((selection, neighbours)) = self.neighbours(&dragged, ctx) else {
            return;
        };
        let p = dragged.point.point;
        let matcher = Matcher::new(&dragged, self.tolerance(ctx), self.always_snap(ctx), Some(constraint));

        // Follow the constraint to where the distributed coordinate is reached
        for horizontal in [true, false] {
            let Some((shift, target)) = neighbours.best_move(selection, horizontal) else {
                continue;
            };
            let goal = p + shift;
            let line = if horizontal {
                Line::vertical(goal.x)
            } else {
                Line::horizontal(goal.y)
            };
            let Some(point) = nearest_to(constraint.crossings_with_line(&line), goal) else {
                continue;
            };
            if let Some(snapped) = matcher.matched_as(point, target, None, false, true) {
                isr.add_point(snapped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ExclusionSet, SnapCandidatePoint, SnapperQuery};
    use crate::document::{MemoryDocument, ObjectGeometry};
    use crate::view::SnapView;

    fn run(doc: &MemoryDocument, p: Point, selection: Rect, source: SnapSource, constraint: Option<&Constraint>) -> IntermSnapResults {
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::DistributionEnabled, true);
        let query = SnapperQuery::point(p).source(source).selection_bbox(selection);
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
        DistributionSnapper.find_best_snap(&mut isr, &dragged, constraint, &ctx, &mut SnapCache::new());
        isr
    }

    fn boxes(doc: &mut MemoryDocument, rects: &[Rect]) {
        for &rect in rects {
            doc.add_object(ObjectGeometry::bbox_only(rect));
        }
    }

    #[test]
    fn test_neighbours_by_side() {
        let selection = Rect::new(10.0, 10.0, 20.0, 20.0);
        let neighbours = Neighbours::collect(
            selection,
            [
                Rect::new(50.0, 12.0, 60.0, 18.0),
                Rect::new(30.0, 0.0, 40.0, 15.0),
                Rect::new(-10.0, 10.0, 0.0, 20.0),
                Rect::new(12.0, 40.0, 18.0, 50.0),
                Rect::new(12.0, -20.0, 18.0, -5.0),
                // Diagonal, in neither band
                Rect::new(40.0, 40.0, 50.0, 50.0),
                // Touching
                Rect::new(20.0, 10.0, 25.0, 20.0),
            ],
        );
        assert_eq!(neighbours.right, vec![Rect::new(30.0, 0.0, 40.0, 15.0), Rect::new(50.0, 12.0, 60.0, 18.0)]);
        assert_eq!(neighbours.left.len(), 1);
        assert_eq!(neighbours.down.len(), 1);
        assert_eq!(neighbours.up.len(), 1);
    }

    #[test]
    fn test_equal_gap_to_the_right() {
        let mut doc = MemoryDocument::new();
        boxes(&mut doc, &[Rect::new(30.0, 0.0, 40.0, 10.0), Rect::new(50.0, 0.0, 60.0, 10.0)]);

        // 10.4 to the first neighbour, which keeps 10 to the next
        let isr = run(&doc, Point::new(14.6, 5.0), Rect::new(9.6, 0.0, 19.6, 10.0), SnapSource::BBoxMidpoint, None);
        assert_eq!(isr.points.len(), 1);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::DistributionRight);
        assert!((hit.point - Point::new(15.0, 5.0)).hypot() < 1e-9);
        assert!((hit.distance - 0.4).abs() < 1e-9);
        assert!(!hit.fully_constrained);
    }

    #[test]
    fn test_centred_on_both_axes() {
        let mut doc = MemoryDocument::new();
        boxes(
            &mut doc,
            &[
                Rect::new(0.0, 50.0, 10.0, 60.0),
                Rect::new(30.0, 50.0, 40.0, 60.0),
                Rect::new(15.0, 20.0, 25.0, 30.0),
                Rect::new(15.0, 80.0, 25.0, 90.0),
            ],
        );
        let p = Point::new(20.3, 55.2);
        let selection = Rect::new(15.3, 50.2, 25.3, 60.2);

        let isr = run(&doc, p, selection, SnapSource::BBoxMidpoint, None);
        assert_eq!(isr.points.len(), 1);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::DistributionXY);
        assert!((hit.point - Point::new(20.0, 55.0)).hypot() < 1e-9);
        assert!(hit.fully_constrained);
    }

    #[test]
    fn test_centred_between_two() {
        let mut doc = MemoryDocument::new();
        boxes(&mut doc, &[Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(30.0, 0.0, 40.0, 10.0)]);
        let isr = run(&doc, Point::new(20.3, 5.0), Rect::new(15.3, 0.0, 25.3, 10.0), SnapSource::BBoxMidpoint, None);
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::DistributionX);
        assert!((hit.point - Point::new(20.0, 5.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_constrained_distribution() {
        let mut doc = MemoryDocument::new();
        boxes(&mut doc, &[Rect::new(30.0, 0.0, 40.0, 10.0), Rect::new(50.0, 0.0, 60.0, 10.0)]);
        let constraint = Constraint::from(Line::horizontal(5.0));

        let isr = run(&doc, Point::new(14.6, 5.5), Rect::new(9.6, 0.5, 19.6, 10.5), SnapSource::BBoxMidpoint, Some(&constraint));
        let hit = isr.points[0];
        assert_eq!(hit.target, SnapTarget::DistributionRight);
        assert!((hit.point - Point::new(15.0, 5.0)).hypot() < 1e-9);
        assert!(hit.constrained);
    }

    #[test]
    fn test_only_the_midpoint_distributes() {
        let mut doc = MemoryDocument::new();
        boxes(&mut doc, &[Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(30.0, 0.0, 40.0, 10.0)]);
        let isr = run(&doc, Point::new(20.3, 5.0), Rect::new(15.3, 0.0, 25.3, 10.0), SnapSource::BBoxCorner, None);
        assert!(isr.is_empty());
    }
}
