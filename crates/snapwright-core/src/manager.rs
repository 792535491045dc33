//! Snap manager.
//!
//! The manager owns the session state (idle or dragging), asks every
//! interested snapper for matches and picks the single winner. It reads the
//! shared preferences on every query and listens for changes so a running
//! session drops its caches when the configuration moves under it.

use std::cell::Cell;
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use kurbo::{Point, Vec2};

use crate::candidate::{ExclusionSet, SnapCandidatePoint, SnapSource, SnapTarget, SnapperQuery, ToolContext};
use crate::document::{CanvasLayout, DocumentModel};
use crate::geom::{ceil_to_multiple, floor_to_multiple, Constraint, Line};
use crate::indicator::{Indicator, IndicatorMessage};
use crate::preferences::{SharedPreferences, SnapOption, SubscriptionId};
use crate::providers::SnapCache;
use crate::results::{IntermSnapResults, SnapResult, SnappedPoint};
use crate::snapper::{DragPoint, SnapContext, Snapper, SnapperKind};
use crate::transform::{PureTransform, TransformChoice, TransformSnap};
use crate::view::SnapView;

/// The document and canvas layout a query runs against.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub document: &'a dyn DocumentModel,
    pub layout: &'a dyn CanvasLayout,
}

impl<'a> Scene<'a> {
    pub fn new(document: &'a dyn DocumentModel, layout: &'a dyn CanvasLayout) -> Self {
        Self { document, layout }
    }

    /// Scene backed by one model that provides both sides.
    pub fn of<T: DocumentModel + CanvasLayout>(model: &'a T) -> Self {
        Self {
            document: model,
            layout: model,
        }
    }
}

/// State kept while a drag is in progress.
///
/// The snapper list is built from the layout once, when the drag starts.
/// Grids, guides and pages added mid-drag are picked up by the next session.
#[derive(Debug)]
pub struct Session {
    tool: ToolContext,
    snappers: Rc<[SnapperKind]>,
    cache: SnapCache,
    queries: usize,
}

impl Session {
    pub fn tool(&self) -> ToolContext {
        self.tool
    }

    pub fn snappers(&self) -> &[SnapperKind] {
        &self.snappers
    }

    pub fn cache(&self) -> &SnapCache {
        &self.cache
    }

    pub fn queries(&self) -> usize {
        self.queries
    }
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Idle,
    Dragging(Session),
}

/// Runs snap queries for one view of a document.
pub struct SnapManager {
    preferences: SharedPreferences,
    view: SnapView,
    state: SessionState,
    indicator: Option<Box<dyn Indicator>>,
    /// Set by the preference observer, cleared when caches are dropped.
    stale: Rc<Cell<bool>>,
    subscription: SubscriptionId,
}

impl SnapManager {
    pub fn new(preferences: SharedPreferences) -> Self {
        let stale = Rc::new(Cell::new(false));
        let flag = Rc::clone(&stale);
        let subscription = preferences.borrow_mut().subscribe(move |change| {
            log::trace!("Snap preference {} changed", change.option.name());
            flag.set(true);
        });
        Self {
            preferences,
            view: SnapView::default(),
            state: SessionState::Idle,
            indicator: None,
            stale,
            subscription,
        }
    }

    pub fn with_view(mut self, view: SnapView) -> Self {
        self.view = view;
        self
    }

    pub fn set_view(&mut self, view: SnapView) {
        self.view = view;
    }

    pub fn view(&self) -> &SnapView {
        &self.view
    }

    /// Handle on the shared preferences.
    pub fn preferences(&self) -> SharedPreferences {
        Rc::clone(&self.preferences)
    }

    pub fn set_indicator(&mut self, indicator: impl Indicator + 'static) {
        self.indicator = Some(Box::new(indicator));
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SessionState::Dragging(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Dragging(session) => Some(session),
            SessionState::Idle => None,
        }
    }

    /// Start a drag over `scene`. Starting while dragging restarts the session.
    pub fn begin_session(&mut self, scene: &Scene<'_>, tool: ToolContext) {
        if let SessionState::Dragging(previous) = &self.state {
            log::debug!("Restarting snap session after {} queries", previous.queries);
        }
        let snappers: Rc<[SnapperKind]> = SnapperKind::for_layout(scene.layout).into();
        log::debug!("Snap session started ({:?}) with {} snappers", tool, snappers.len());
        self.state = SessionState::Dragging(Session {
            tool,
            snappers,
            cache: SnapCache::new(),
            queries: 0,
        });
        self.stale.set(false);
    }

    /// Finish a drag; the last indicator stays until it expires.
    pub fn end_session(&mut self) {
        match std::mem::take(&mut self.state) {
            SessionState::Dragging(session) => log::debug!(
                "Snap session ended after {} queries (grid cache: {} hits, {} misses)",
                session.queries,
                session.cache.hits(),
                session.cache.misses()
            ),
            SessionState::Idle => log::trace!("end_session while idle"),
        }
    }

    /// Abort a drag and remove any indicator.
    pub fn cancel_session(&mut self) {
        if let SessionState::Dragging(session) = std::mem::take(&mut self.state) {
            log::debug!("Snap session cancelled after {} queries", session.queries);
        }
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.clear();
        }
    }

    /// Snap a query, along its constraint when it has one.
    pub fn query(&mut self, scene: &Scene<'_>, query: &SnapperQuery) -> SnapResult {
        match query.constraint {
            Some(constraint) => self.snap_point_along_constraint(scene, query, &constraint),
            None => self.snap_point(scene, query),
        }
    }

    /// Free snap of every point in `query`; the best single match wins.
    ///
    /// `query.constraint` is ignored here; [`query`](Self::query) honours it.
    pub fn snap_point(&mut self, scene: &Scene<'_>, query: &SnapperQuery) -> SnapResult {
        let result = self.free_result(scene, query);
        self.indicate(&result);
        result
    }

    /// Snap while the drag is locked to `constraint`.
    ///
    /// Without a match the point is still projected onto the constraint.
    pub fn snap_point_along_constraint(&mut self, scene: &Scene<'_>, query: &SnapperQuery, constraint: &Line) -> SnapResult {
        let Some(first) = query.points.first().map(|p| p.point) else {
            return SnapResult::none(Point::ZERO);
        };
        let mouse_pointer = self.preferences.borrow().bool(SnapOption::MousePointer);

        let result = if mouse_pointer && query.is_single_handle() {
            // Snap where the pointer is, then enforce the constraint
            let free = self.free_result(scene, query);
            if free.is_snapped() {
                let point = constraint.project(free.point);
                SnapResult {
                    point,
                    offset: point - free.original,
                    constrained: true,
                    ..free
                }
            } else {
                SnapResult::constrained_only(first, constraint.project(first), SnapTarget::Constraint)
            }
        } else {
            self.constrained_result(scene, query, &[Constraint::from(*constraint)])
        };
        self.indicate(&result);
        result
    }

    /// Snap along whichever of `constraints` works best.
    ///
    /// Without a match the point goes to the nearest projection.
    pub fn multiple_constrained_snaps(
        &mut self,
        scene: &Scene<'_>,
        query: &SnapperQuery,
        constraints: &[Line],
    ) -> SnapResult {
        let constraints: Vec<Constraint> = constraints.iter().copied().map(Constraint::from).collect();
        let result = self.constrained_result(scene, query, &constraints);
        self.indicate(&result);
        result
    }

    /// Snap the direction from `origin` to multiples of `PI / snaps`.
    ///
    /// Angles are measured from the y axis, offset by the direction of
    /// `reference` when given. `snaps == 0` means a plain free snap.
    pub fn constrained_angular_snap(
        &mut self,
        scene: &Scene<'_>,
        query: &SnapperQuery,
        reference: Option<Point>,
        origin: Point,
        snaps: u32,
    ) -> SnapResult {
        if snaps == 0 {
            return self.snap_point(scene, query);
        }
        let Some(first) = query.points.first().map(|p| p.point) else {
            return SnapResult::none(Point::ZERO);
        };
        let y_axis = Vec2::new(0.0, 1.0);
        let angle = angle_between(y_axis, first - origin);
        let increment = PI / f64::from(snaps);
        let offset = reference.map_or(0.0, |r| angle_between(y_axis, r - origin));

        let constraints = [
            Constraint::from(Line::from_angle(origin, ceil_to_multiple(angle, increment, offset) - FRAC_PI_2)),
            Constraint::from(Line::from_angle(origin, floor_to_multiple(angle, increment, offset) - FRAC_PI_2)),
        ];
        let mut result = self.constrained_result(scene, query, &constraints);
        if !result.is_snapped() {
            result.target = SnapTarget::ConstrainedAngle;
        }
        self.indicate(&result);
        result
    }

    /// Round a translation to a multiple of the grid spacing.
    ///
    /// Each grid is tried on its own and the nearest multiple wins. Returns
    /// `t` unchanged when no grid snaps.
    pub fn multiple_of_grid_pitch(&mut self, scene: &Scene<'_>, t: Vec2) -> Vec2 {
        if !self.preferences.borrow().is_enabled() {
            return t;
        }
        let snappers = self.snappers_for(scene);
        let mut nearest: Option<(Vec2, SnapResult)> = None;
        for snapper in snappers.iter().filter(|s| s.is_grid()) {
            let Some(origin) = snapper.grid_origin() else {
                continue;
            };
            let start = origin + t;
            let query = SnapperQuery::with_points(vec![SnapCandidatePoint::new(start, SnapSource::GridPitch)]);
            let dragged_points = drag_points_of(&query);
            let Some(snapped) = self.best_snap(scene, &query, &dragged_points, std::slice::from_ref(snapper), &[], true) else {
                continue;
            };
            if nearest.as_ref().is_none_or(|(_, best)| snapped.distance < best.distance) {
                nearest = Some((snapped.point - origin, SnapResult::from_snapped(&snapped, start)));
            }
        }
        match nearest {
            Some((multiple, result)) => {
                self.indicate(&result);
                multiple
            }
            None => t,
        }
    }

    /// Snap a selection being transformed by `transform`.
    ///
    /// `query.points` are the untransformed control points. Each transformed
    /// point is snapped, along the line or circle the transform allows it to
    /// move on when there is one, and the transform is refitted to the snap
    /// that moves the whole selection least.
    pub fn snap_transform(&mut self, scene: &Scene<'_>, query: &SnapperQuery, transform: &PureTransform) -> TransformSnap {
        let originals: Vec<Point> = query.points.iter().map(|p| p.point).collect();
        let moved = SnapperQuery {
            points: query
                .points
                .iter()
                .map(|p| SnapCandidatePoint {
                    point: transform.apply(p.point),
                    ..*p
                })
                .collect(),
            constraint: None,
            bbox: query.bbox.map(|bbox| transform.affine().transform_rect_bbox(bbox)),
            ..query.clone()
        };
        let snappers = self.snappers_for(scene);

        let mut choice = TransformChoice::new(*transform, &originals);
        for (dragged, original) in drag_points_of(&moved).iter().zip(&originals) {
            let constraints: Vec<Constraint> = transform.constraint(*original).into_iter().collect();
            if let Some(snapped) = self.best_snap(scene, &moved, std::slice::from_ref(dragged), &snappers, &constraints, false) {
                choice.offer(snapped);
            }
        }
        let snap = choice.finish();
        self.indicate(&snap.result);
        snap
    }

    fn free_result(&mut self, scene: &Scene<'_>, query: &SnapperQuery) -> SnapResult {
        let snappers = self.snappers_for(scene);
        let dragged_points = drag_points_of(query);
        match self.best_snap(scene, query, &dragged_points, &snappers, &[], false) {
            Some(snapped) => SnapResult::from_snapped(&snapped, original_point(query, snapped.source_index)),
            None => SnapResult::none(original_point(query, 0)),
        }
    }

    fn constrained_result(&mut self, scene: &Scene<'_>, query: &SnapperQuery, constraints: &[Constraint]) -> SnapResult {
        let first = original_point(query, 0);
        if constraints.is_empty() {
            return SnapResult::none(first);
        }
        let snappers = self.snappers_for(scene);
        let dragged_points = drag_points_of(query);
        if let Some(snapped) = self.best_snap(scene, query, &dragged_points, &snappers, constraints, false) {
            return SnapResult::from_snapped(&snapped, original_point(query, snapped.source_index));
        }
        let projected = constraints
            .iter()
            .map(|c| c.project(first))
            .min_by(|a, b| a.distance(first).total_cmp(&b.distance(first)))
            .unwrap_or(first);
        SnapResult::constrained_only(first, projected, SnapTarget::Constraint)
    }

    /// The tool deciding which snappers run: the session's while dragging.
    fn tool_for(&self, query: &SnapperQuery) -> ToolContext {
        self.session().map_or(query.tool, Session::tool)
    }

    /// The session's snappers while dragging, else a fresh list for `scene`.
    fn snappers_for(&self, scene: &Scene<'_>) -> Rc<[SnapperKind]> {
        match &self.state {
            SessionState::Dragging(session) => Rc::clone(&session.snappers),
            SessionState::Idle => SnapperKind::for_layout(scene.layout).into(),
        }
    }

    /// Run `snappers` for each dragged point and return the overall winner.
    ///
    /// An empty `constraints` slice means a free snap; otherwise every
    /// constraint is searched and the matches compete together.
    fn best_snap(
        &mut self,
        scene: &Scene<'_>,
        query: &SnapperQuery,
        dragged_points: &[DragPoint],
        snappers: &[SnapperKind],
        constraints: &[Constraint],
        allow_offscreen: bool,
    ) -> Option<SnappedPoint> {
        let preferences = Rc::clone(&self.preferences);
        let prefs = preferences.borrow();
        if !prefs.is_enabled() {
            return None;
        }
        let tool = self.tool_for(query);
        let active: Vec<&SnapperKind> = snappers.iter().filter(|s| s.is_interested(&prefs, tool)).collect();
        if active.is_empty() {
            log::trace!("No snapper interested ({:?})", tool);
            return None;
        }
        let viewport = (!allow_offscreen).then(|| self.view.visible_area());
        let exclusions = ExclusionSet::expand(&query.exclusions, scene.document);

        let stale = self.stale.replace(false);
        let mut scratch = SnapCache::new();
        let cache = match &mut self.state {
            SessionState::Dragging(session) => {
                if stale {
                    log::debug!("Preferences changed, dropping snap caches");
                    session.cache.clear();
                }
                session.queries += 1;
                &mut session.cache
            }
            SessionState::Idle => &mut scratch,
        };

        let ctx = SnapContext {
            document: scene.document,
            layout: scene.layout,
            preferences: &prefs,
            view: &self.view,
            exclusions: &exclusions,
            query,
        };
        let constrained = !constraints.is_empty();
        let prefer_points = prefs.bool(SnapOption::PreferPoints);

        let mut best: Option<SnappedPoint> = None;
        for dragged in dragged_points {
            if !prefs.is_source_snappable(dragged.point.source) {
                continue;
            }
            let mut isr = IntermSnapResults::new();
            for snapper in &active {
                if constrained {
                    for constraint in constraints {
                        snapper.find_best_snap(&mut isr, dragged, Some(constraint), &ctx, cache);
                    }
                } else {
                    snapper.find_best_snap(&mut isr, dragged, None, &ctx, cache);
                }
            }
            let found = isr.find_best(&dragged.point, &prefs, constrained, query.to_paths_only, viewport);
            log::trace!(
                "Snap point {} at ({:.3}, {:.3}): {} matches from {} snappers, winner {:?}",
                dragged.index,
                dragged.point.point.x,
                dragged.point.point.y,
                isr.len(),
                active.len(),
                found.map(|s| s.target)
            );
            if let Some(candidate) = found {
                if best.as_ref().is_none_or(|current| candidate.outranks(current, prefer_points)) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn indicate(&mut self, result: &SnapResult) {
        let Some(indicator) = self.indicator.as_mut() else {
            return;
        };
        let prefs = self.preferences.borrow();
        if !prefs.bool(SnapOption::IndicatorEnabled) {
            return;
        }
        if let Some(message) = IndicatorMessage::for_result(result, prefs.indicator_persistence()) {
            indicator.show(message);
        }
    }
}

impl Drop for SnapManager {
    fn drop(&mut self) {
        // The preferences may be mid-notification if a view is dropped from an observer
        if let Ok(mut prefs) = self.preferences.try_borrow_mut() {
            prefs.unsubscribe(self.subscription);
        }
    }
}

fn drag_points_of(query: &SnapperQuery) -> Vec<DragPoint> {
    query
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| DragPoint::new(index, *point))
        .collect()
}

fn original_point(query: &SnapperQuery, index: usize) -> Point {
    query.points.get(index).map_or(Point::ZERO, |p| p.point)
}

/// Signed angle from `a` to `b`.
fn angle_between(a: Vec2, b: Vec2) -> f64 {
    a.cross(b).atan2(a.dot(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use kurbo::Rect;

    use crate::document::{MemoryDocument, ObjectGeometry};
    use crate::grid::GridConfig;
    use crate::preferences::SnapPreferences;
    use crate::transform::PureTransform;
    use crate::view::DEFAULT_SCREEN_SIZE;

    fn manager_with(prefs: SnapPreferences) -> SnapManager {
        SnapManager::new(prefs.shared()).with_view(SnapView::centered_on(Point::ZERO, 1.0, DEFAULT_SCREEN_SIZE))
    }

    fn object_prefs(tolerance: f64) -> SnapPreferences {
        let mut prefs = SnapPreferences::new();
        prefs.set_number(SnapOption::ObjectTolerance, tolerance).unwrap();
        prefs
    }

    fn grid_prefs() -> SnapPreferences {
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::GridVisibleOnly, false);
        prefs.set_number(SnapOption::GridTolerance, 2.0).unwrap();
        prefs
    }

    fn five_grid() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0)));
        doc
    }

    #[derive(Clone, Default)]
    struct Recorder {
        shown: Rc<RefCell<Vec<IndicatorMessage>>>,
        cleared: Rc<Cell<usize>>,
    }

    impl Indicator for Recorder {
        fn show(&mut self, message: IndicatorMessage) {
            self.shown.borrow_mut().push(message);
        }

        fn clear(&mut self) {
            self.cleared.set(self.cleared.get() + 1);
        }
    }

    #[test]
    fn test_scenario_rectangle_corner() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut manager = manager_with(object_prefs(2.0));

        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(10.5, 10.5)));
        assert!(result.is_snapped());
        assert_eq!(result.point, Point::new(10.0, 10.0));
        assert_eq!(result.target, SnapTarget::BBoxCorner);
        assert!((result.distance - 0.5f64.hypot(0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_out_of_tolerance() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut manager = manager_with(object_prefs(2.0));

        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(13.0, 13.0)));
        assert!(!result.is_snapped());
        assert_eq!(result.point_if_snapped(), Point::new(13.0, 13.0));
    }

    #[test]
    fn test_scenario_grid_intersection() {
        let doc = five_grid();
        let query = SnapperQuery::point(Point::new(7.8, 2.1));

        // Every line is more than 2 units away
        let mut manager = manager_with(grid_prefs());
        assert!(!manager.query(&Scene::of(&doc), &query).is_snapped());

        // Only line-pair crossings compete; the nearest is (10, 0)
        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridAlwaysSnap, true);
        prefs.set_bool(SnapOption::GridLines, false);
        let mut manager = manager_with(prefs);
        let result = manager.query(&Scene::of(&doc), &query);
        assert!(result.is_snapped());
        assert_eq!(result.target, SnapTarget::GridIntersection);
        assert!((result.point - Point::new(10.0, 0.0)).hypot() < 1e-9);
        assert!(result.always_snap);

        // With lines on, the nearer line y = 0 wins
        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridAlwaysSnap, true);
        let mut manager = manager_with(prefs);
        let result = manager.query(&Scene::of(&doc), &query);
        assert_eq!(result.target, SnapTarget::Grid);
        assert!((result.point - Point::new(7.8, 0.0)).hypot() < 1e-9);

        // Unless points are preferred
        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridAlwaysSnap, true);
        prefs.set_bool(SnapOption::PreferPoints, true);
        let mut manager = manager_with(prefs);
        let result = manager.query(&Scene::of(&doc), &query);
        assert_eq!(result.target, SnapTarget::GridIntersection);
    }

    #[test]
    fn test_scenario_always_snap_intersection() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(0.0, 0.0), Point::new(10.0, 10.0)], false));
        doc.add_object(ObjectGeometry::polyline(&[Point::new(0.0, 10.0), Point::new(10.0, 0.0)], false));
        doc.add_object(ObjectGeometry::polyline(&[Point::new(5.0, 5.2)], false));

        let mut prefs = object_prefs(0.1);
        prefs.set_bool(SnapOption::PathIntersections, true);
        prefs.set_bool(SnapOption::AlwaysSnapIntersections, true);
        let mut manager = manager_with(prefs);

        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(5.0, 5.05)));
        assert!(result.is_snapped());
        assert_eq!(result.target, SnapTarget::PathIntersection);
        assert!((result.point - Point::new(5.0, 5.0)).hypot() < 1e-9);
        assert!(result.always_snap);
    }

    #[test]
    fn test_scenario_transition_to_simple() {
        let mut prefs = SnapPreferences::new();
        prefs.set_simple_mode(false);
        prefs.set_bool(SnapOption::PathIntersections, true);
        prefs.set_bool(SnapOption::NodesEnabled, true);
        prefs.transition_to_simple();

        assert!(prefs.is_simple_mode());
        assert!(prefs.bool(SnapOption::NodesEnabled));
        assert!(!prefs.bool(SnapOption::PathIntersections));
        assert!(!prefs.is_target_snappable(SnapTarget::PathIntersection));
        assert!(prefs.is_target_snappable(SnapTarget::NodeCusp));
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let mut doc = five_grid();
        doc.add_object(ObjectGeometry::rectangle(Rect::new(1.0, 1.0, 9.0, 9.0)));
        let mut manager = manager_with(grid_prefs());
        let query = SnapperQuery::point(Point::new(8.7, 9.4));
        let first = manager.query(&Scene::of(&doc), &query);
        for _ in 0..5 {
            assert_eq!(manager.query(&Scene::of(&doc), &query), first);
        }
    }

    #[test]
    fn test_excluded_object_never_reported() {
        let mut doc = MemoryDocument::new();
        let dragged = doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let group = doc.add_group(vec![dragged]);
        // Same geometry, different object
        let twin = doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut manager = manager_with(object_prefs(2.0));

        let query = SnapperQuery::point(Point::new(10.5, 10.5)).exclude(group);
        let result = manager.query(&Scene::of(&doc), &query);
        assert!(result.is_snapped());
        assert_eq!(result.object, Some(twin));

        doc.set_locked(twin, true);
        assert!(!manager.query(&Scene::of(&doc), &query).is_snapped());
    }

    #[test]
    fn test_empty_document_never_snaps() {
        let doc = MemoryDocument::new();
        let mut manager = manager_with(SnapPreferences::new());
        let scene = Scene::of(&doc);
        let result = manager.query(&scene, &SnapperQuery::point(Point::new(3.0, 4.0)));
        assert_eq!(result, SnapResult::none(Point::new(3.0, 4.0)));
        assert_eq!(manager.multiple_of_grid_pitch(&scene, Vec2::new(1.5, 2.5)), Vec2::new(1.5, 2.5));
    }

    #[test]
    fn test_node_beats_grid_at_equal_distance() {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::rectangular(Point::ZERO, Vec2::new(10.0, 10.0)));
        doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::GridVisibleOnly, false);
        prefs.set_bool(SnapOption::GridLines, false);
        let mut manager = manager_with(prefs);

        // Node and grid crossing both 0.5 away
        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(10.5, 10.0)));
        assert_eq!(result.target, SnapTarget::NodeCusp);
        assert_eq!(result.point, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_disabled_snapping_and_navigation() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let query = SnapperQuery::point(Point::new(10.5, 10.5));

        let mut manager = manager_with(SnapPreferences::new());
        let nav = query.clone().tool(ToolContext::Navigation);
        assert!(!manager.query(&Scene::of(&doc), &nav).is_snapped());

        manager.preferences().borrow_mut().set_bool(SnapOption::Enabled, false);
        assert!(!manager.query(&Scene::of(&doc), &query).is_snapped());
    }

    #[test]
    fn test_session_lifecycle_and_cache() {
        let doc = five_grid();
        let mut manager = manager_with(grid_prefs());
        let scene = Scene::of(&doc);
        assert!(!manager.is_dragging());

        manager.begin_session(&scene, ToolContext::Selector);
        manager.query(&scene, &SnapperQuery::point(Point::new(7.8, 2.1)));
        manager.query(&scene, &SnapperQuery::point(Point::new(8.1, 2.3)));
        let session = manager.session().unwrap();
        assert_eq!(session.queries(), 2);
        assert_eq!(session.cache().misses(), 1);
        assert_eq!(session.cache().hits(), 1);

        // A preference change drops the warm cache
        manager.preferences().borrow_mut().set_number(SnapOption::GridTolerance, 3.0).unwrap();
        manager.query(&scene, &SnapperQuery::point(Point::new(8.1, 2.3)));
        assert_eq!(manager.session().unwrap().cache().misses(), 1);
        assert_eq!(manager.session().unwrap().cache().hits(), 0);

        manager.end_session();
        assert!(!manager.is_dragging());
        assert!(manager.session().is_none());
    }

    #[test]
    fn test_cancel_clears_indicator() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let recorder = Recorder::default();
        let mut manager = manager_with(SnapPreferences::new());
        manager.set_indicator(recorder.clone());

        manager.begin_session(&Scene::of(&doc), ToolContext::NodeEditor);
        let query = SnapperQuery::point(Point::new(10.5, 10.5)).source(SnapSource::NodeCusp);
        manager.query(&Scene::of(&doc), &query);
        assert_eq!(recorder.shown.borrow().len(), 1);
        assert_eq!(recorder.shown.borrow()[0].description, "cusp node to cusp node");

        manager.cancel_session();
        assert!(!manager.is_dragging());
        assert_eq!(recorder.cleared.get(), 1);

        manager.preferences().borrow_mut().set_bool(SnapOption::IndicatorEnabled, false);
        manager.query(&Scene::of(&doc), &query);
        assert_eq!(recorder.shown.borrow().len(), 1);
    }

    #[test]
    fn test_constraint_projection_without_match() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(5.0, 3.0)], false));
        let mut manager = manager_with(SnapPreferences::new());

        let query = SnapperQuery::point(Point::new(5.0, 2.5)).constrained(Line::horizontal(0.0));
        let result = manager.query(&Scene::of(&doc), &query);
        assert!(!result.is_snapped());
        assert_eq!(result.target, SnapTarget::Constraint);
        assert_eq!(result.point, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_constrained_snap_to_node_on_line() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(6.0, 0.0)], false));
        let mut manager = manager_with(SnapPreferences::new());

        let query = SnapperQuery::point(Point::new(5.0, 2.5)).constrained(Line::horizontal(0.0));
        let result = manager.query(&Scene::of(&doc), &query);
        assert!(result.is_snapped());
        assert!(result.constrained);
        assert_eq!(result.point, Point::new(6.0, 0.0));
    }

    #[test]
    fn test_mouse_pointer_snap_then_project() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(5.0, 3.0)], false));
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::MousePointer, true);
        let mut manager = manager_with(prefs);

        let query = SnapperQuery::point(Point::new(5.2, 2.5));
        let result = manager.snap_point_along_constraint(&Scene::of(&doc), &query, &Line::horizontal(0.0));
        assert!(result.is_snapped());
        assert_eq!(result.point, Point::new(5.0, 0.0));
        assert!(result.constrained);
    }

    #[test]
    fn test_multiple_constraints_pick_nearest_projection() {
        let doc = MemoryDocument::new();
        let mut manager = manager_with(SnapPreferences::new());
        let constraints = [Line::horizontal(0.0), Line::vertical(0.0)];
        let query = SnapperQuery::point(Point::new(1.0, 5.0));
        let result = manager.multiple_constrained_snaps(&Scene::of(&doc), &query, &constraints);
        assert!(!result.is_snapped());
        assert_eq!(result.point, Point::new(0.0, 5.0));
    }

    #[test]
    fn test_angular_snap_projects_onto_nearest_angle() {
        let doc = MemoryDocument::new();
        let mut manager = manager_with(SnapPreferences::new());
        let scene = Scene::of(&doc);
        let query = SnapperQuery::point(Point::new(10.0, 1.0));

        let result = manager.constrained_angular_snap(&scene, &query, None, Point::ZERO, 4);
        assert!(!result.is_snapped());
        assert_eq!(result.target, SnapTarget::ConstrainedAngle);
        assert!((result.point - Point::new(10.0, 0.0)).hypot() < 1e-9);

        let free = manager.constrained_angular_snap(&scene, &query, None, Point::ZERO, 0);
        assert_eq!(free, SnapResult::none(Point::new(10.0, 1.0)));
    }

    #[test]
    fn test_grid_pitch_multiple() {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::rectangular(Point::new(1.0, 0.0), Vec2::new(5.0, 5.0)));
        let mut prefs = SnapPreferences::new();
        prefs.set_bool(SnapOption::GridVisibleOnly, false);
        let mut manager = manager_with(prefs);

        let rounded = manager.multiple_of_grid_pitch(&Scene::of(&doc), Vec2::new(7.8, 0.4));
        assert!((rounded - Vec2::new(10.0, 0.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_snap_translation() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::rectangle(Rect::new(10.0, 10.0, 20.0, 20.0)));
        let mut manager = manager_with(SnapPreferences::new());

        let query = SnapperQuery::point(Point::ZERO).source(SnapSource::BBoxCorner);
        let snap = manager.snap_transform(&Scene::of(&doc), &query, &PureTransform::translate(Vec2::new(9.6, 9.7)));
        assert!(snap.result.is_snapped());
        match snap.transform {
            PureTransform::Translate { vector, .. } => assert!((vector - Vec2::new(10.0, 10.0)).hypot() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_snap_uniform_scale_along_ray() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(20.0, 0.0)], false));
        let mut manager = manager_with(SnapPreferences::new());

        let query = SnapperQuery::point(Point::new(10.0, 0.0)).source(SnapSource::BBoxCorner);
        let transform = PureTransform::scale(Vec2::new(1.96, 1.96), Point::ZERO, true);
        let snap = manager.snap_transform(&Scene::of(&doc), &query, &transform);
        match snap.transform {
            PureTransform::Scale { factor, .. } => {
                assert!((factor.x - 2.0).abs() < 1e-9);
                assert!((factor.y - 2.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rotation_snaps_only_on_its_circle() {
        // (0, 9) is close to the rotated point but off the radius-10 circle
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(0.0, 9.0)], false));
        let mut manager = manager_with(SnapPreferences::new());
        let query = SnapperQuery::point(Point::new(10.0, 0.0)).source(SnapSource::NodeCusp);
        let rotate = PureTransform::rotate(1.5, Point::ZERO);
        let snap = manager.snap_transform(&Scene::of(&doc), &query, &rotate);
        assert!(!snap.result.is_snapped());
        assert_eq!(snap.transform, rotate);

        // (6, 8) lies on the circle, so the refit lands exactly on it
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::polyline(&[Point::new(6.0, 8.0)], false));
        let snap = manager.snap_transform(&Scene::of(&doc), &query, &PureTransform::rotate(0.95, Point::ZERO));
        assert!(snap.result.is_snapped());
        let landed = snap.transform.apply(Point::new(10.0, 0.0));
        assert!((landed - Point::new(6.0, 8.0)).hypot() < 1e-9);
        assert!((landed - snap.result.point).hypot() < 1e-9);
    }

    #[test]
    fn test_axonometric_grid_crossing() {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::axonometric(Point::ZERO, 10.0, 30.0, 30.0));
        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridLines, false);
        let mut manager = manager_with(prefs);

        // The vertical x = 5√3 meets the x-axis line through (0, 10) at y = 5
        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(8.4, 5.3)));
        assert!(result.is_snapped());
        assert_eq!(result.target, SnapTarget::GridIntersection);
        assert!((result.point - Point::new(5.0 * 3f64.sqrt(), 5.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_rotated_grid_crossing() {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::rectangular(Point::ZERO, Vec2::new(10.0, 10.0)).with_rotation(30.0));
        let query = SnapperQuery::point(Point::new(8.4, 5.3));

        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridLines, false);
        let mut manager = manager_with(prefs);
        let result = manager.query(&Scene::of(&doc), &query);
        assert_eq!(result.target, SnapTarget::GridIntersection);
        assert!((result.point - Point::new(5.0 * 3f64.sqrt(), 5.0)).hypot() < 1e-9);

        // The rotated line through that crossing is nearer still
        let mut manager = manager_with(grid_prefs());
        let result = manager.query(&Scene::of(&doc), &query);
        assert_eq!(result.target, SnapTarget::Grid);
        let (sin, cos) = 30f64.to_radians().sin_cos();
        assert!((result.distance - (10.0 - (8.4 * cos + 5.3 * sin))).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_turn_grid_crossing() {
        let mut doc = MemoryDocument::new();
        doc.add_grid(GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0)).with_rotation(90.0));
        let mut prefs = grid_prefs();
        prefs.set_bool(SnapOption::GridLines, false);
        let mut manager = manager_with(prefs);

        let result = manager.query(&Scene::of(&doc), &SnapperQuery::point(Point::new(9.2, 0.6)));
        assert_eq!(result.target, SnapTarget::GridIntersection);
        assert!((result.point - Point::new(10.0, 0.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_session_keeps_its_snappers() {
        let doc = five_grid();
        let scene = Scene::of(&doc);
        let mut manager = manager_with(grid_prefs());
        let query = SnapperQuery::point(Point::new(9.2, 0.6));
        let idle = manager.query(&scene, &query);

        manager.begin_session(&scene, ToolContext::Selector);
        let session = manager.session().unwrap();
        assert_eq!(session.snappers().iter().filter(|s| s.is_grid()).count(), 1);
        assert_eq!(session.snappers().len(), SnapperKind::for_layout(scene.layout).len());
        assert_eq!(manager.query(&scene, &query), idle);

        // A layout change mid-drag waits for the next session
        let empty = MemoryDocument::new();
        assert_eq!(manager.query(&Scene::of(&empty), &query), idle);
        manager.end_session();
        assert!(!manager.query(&Scene::of(&empty), &query).is_snapped());
    }

    #[test]
    fn test_alignment_and_distribution() {
        let mut doc = MemoryDocument::new();
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(30.0, 0.0, 40.0, 10.0)));
        doc.add_object(ObjectGeometry::bbox_only(Rect::new(50.0, 0.0, 60.0, 10.0)));
        let mut prefs = object_prefs(0.1);
        prefs.set_bool(SnapOption::AlignmentEnabled, true);
        prefs.set_bool(SnapOption::DistributionEnabled, true);
        let mut manager = manager_with(prefs);
        let scene = Scene::of(&doc);

        // A corner lines up with the neighbours' bottom edge
        let corner = SnapperQuery::point(Point::new(19.6, 10.3)).source(SnapSource::BBoxCorner);
        let result = manager.query(&scene, &corner);
        assert_eq!(result.target, SnapTarget::AlignmentBBoxCorner);
        assert!((result.point - Point::new(19.6, 10.0)).hypot() < 1e-9);

        // The midpoint takes the gap of 10 the neighbours keep
        let midpoint = SnapperQuery::point(Point::new(14.6, 5.3))
            .source(SnapSource::BBoxMidpoint)
            .selection_bbox(Rect::new(9.6, 0.3, 19.6, 10.3));
        let result = manager.query(&scene, &midpoint);
        assert_eq!(result.target, SnapTarget::DistributionRight);
        assert!((result.point - Point::new(15.0, 5.3)).hypot() < 1e-9);
    }

    #[test]
    fn test_dropping_manager_unsubscribes() {
        let prefs = SnapPreferences::new().shared();
        let manager = SnapManager::new(Rc::clone(&prefs));
        let id = manager.subscription;
        let stale = Rc::clone(&manager.stale);
        drop(manager);

        prefs.borrow_mut().set_bool(SnapOption::GridEnabled, false);
        assert!(!stale.get());
        assert!(!prefs.borrow_mut().unsubscribe(id));
    }
}
