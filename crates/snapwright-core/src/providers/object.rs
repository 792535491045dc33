//! Object provider: nodes, bounding boxes, paths, text and path crossings
//! of the visible objects.

use kurbo::{Point, Rect};

use crate::candidate::{ExclusionSet, SnapCandidate, SnapTarget};
use crate::document::{DocumentModel, NodeKind, ObjectGeometry, ObjectId};
use crate::geom::{
    intersect_segments, nearest_on_segment, points_coincide, rect_corners, rect_edges, segment_is_degenerate, Segment,
};
use crate::preferences::SnapPreferences;

/// Most objects scanned for one query.
pub const MAX_SNAP_OBJECTS: usize = 200;

/// Where path/path intersections are looked for.
#[derive(Debug, Clone, PartialEq)]
pub enum IntersectionScope {
    /// Skip intersections entirely.
    Off,
    /// Only segments passing within `radius` of one of `points`.
    Near { points: Vec<Point>, radius: f64 },
    /// Every scanned segment (always-snap intersections).
    Everywhere,
}

impl IntersectionScope {
    fn admits(&self, segment: &Segment) -> bool {
        match self {
            IntersectionScope::Off => false,
            IntersectionScope::Near { points, radius } => points
                .iter()
                .any(|&p| nearest_on_segment(p, segment).distance(p) <= *radius),
            IntersectionScope::Everywhere => true,
        }
    }
}

/// Walks visible, unlocked, non-excluded objects.
pub struct ObjectProvider<'a> {
    document: &'a dyn DocumentModel,
    exclusions: &'a ExclusionSet,
    prefs: &'a SnapPreferences,
}

impl<'a> ObjectProvider<'a> {
    pub fn new(document: &'a dyn DocumentModel, exclusions: &'a ExclusionSet, prefs: &'a SnapPreferences) -> Self {
        Self {
            document,
            exclusions,
            prefs,
        }
    }

    /// Objects in `area` that may be snapped to, at most [`MAX_SNAP_OBJECTS`].
    pub fn objects(&self, area: Rect) -> Vec<(ObjectId, ObjectGeometry)> {
        let mut objects = Vec::new();
        for id in self.document.visible_objects(area) {
            if self.exclusions.contains(id) || self.document.is_locked(id) || self.document.is_hidden(id) {
                continue;
            }
            // Stale handles simply drop out.
            let Some(geometry) = self.document.object_geometry(id) else {
                continue;
            };
            if geometry.is_empty() {
                continue;
            }
            if objects.len() == MAX_SNAP_OBJECTS {
                log::warn!("Snapping limited to the first {} objects in view", MAX_SNAP_OBJECTS);
                break;
            }
            objects.push((id, geometry));
        }
        objects
    }

    /// Candidates of every object in `area`, followed by path crossings.
    ///
    /// Objects are consumed one at a time; crossings need all segments and
    /// are computed up front.
    pub fn candidates(
        &self,
        area: Rect,
        scope: &IntersectionScope,
        always_snap_intersections: bool,
    ) -> impl Iterator<Item = SnapCandidate> + 'a {
        let objects = self.objects(area);
        let crossings = if self.prefs.is_target_snappable(SnapTarget::PathIntersection) {
            path_intersections(&objects, scope, always_snap_intersections)
        } else {
            Vec::new()
        };
        log::trace!(
            "Object provider: {} objects, {} path intersections",
            objects.len(),
            crossings.len()
        );

        let prefs = self.prefs;
        objects
            .into_iter()
            .flat_map(move |(id, geometry)| object_candidates(id, &geometry, prefs))
            .chain(crossings)
    }
}

fn object_candidates(id: ObjectId, geometry: &ObjectGeometry, prefs: &SnapPreferences) -> Vec<SnapCandidate> {
    let snappable = |target| prefs.is_target_snappable(target);
    let object = Some(id);
    let mut out = Vec::new();

    for node in &geometry.nodes {
        let target = match node.kind {
            NodeKind::Cusp => SnapTarget::NodeCusp,
            NodeKind::Smooth => SnapTarget::NodeSmooth,
        };
        if snappable(target) {
            out.push(SnapCandidate::point(node.point, target, object));
        }
    }

    let segments = geometry.segments.iter().filter(|s| !segment_is_degenerate(s));
    if snappable(SnapTarget::LineMidpoint) {
        for segment in segments.clone() {
            out.push(SnapCandidate::point(
                segment.p0.midpoint(segment.p1),
                SnapTarget::LineMidpoint,
                object,
            ));
        }
    }
    if snappable(SnapTarget::Path) {
        for segment in segments {
            out.push(SnapCandidate::segment(*segment, SnapTarget::Path, object));
        }
    }

    if let Some(bbox) = geometry.bbox.map(|b| b.abs()) {
        if snappable(SnapTarget::BBoxCorner) {
            for corner in rect_corners(bbox) {
                out.push(SnapCandidate::point(corner, SnapTarget::BBoxCorner, object));
            }
        }
        if snappable(SnapTarget::BBoxEdgeMidpoint) {
            for edge in rect_edges(bbox) {
                out.push(SnapCandidate::point(
                    edge.p0.midpoint(edge.p1),
                    SnapTarget::BBoxEdgeMidpoint,
                    object,
                ));
            }
        }
        if snappable(SnapTarget::BBoxMidpoint) {
            out.push(SnapCandidate::point(bbox.center(), SnapTarget::BBoxMidpoint, object));
        }
        if snappable(SnapTarget::BBoxEdge) {
            for edge in rect_edges(bbox) {
                out.push(SnapCandidate::segment(edge, SnapTarget::BBoxEdge, object));
            }
        }
    }

    if let Some(anchor) = geometry.text_anchor {
        if snappable(SnapTarget::TextAnchor) {
            out.push(SnapCandidate::point(anchor, SnapTarget::TextAnchor, object));
        }
    }
    if let Some(baseline) = geometry.text_baseline {
        if snappable(SnapTarget::TextBaseline) && !segment_is_degenerate(&baseline) {
            out.push(SnapCandidate::segment(baseline, SnapTarget::TextBaseline, object));
        }
    }

    out
}

/// Crossings between path segments, skipping joints of adjacent segments.
fn path_intersections(
    objects: &[(ObjectId, ObjectGeometry)],
    scope: &IntersectionScope,
    always_snap: bool,
) -> Vec<SnapCandidate> {
    if *scope == IntersectionScope::Off {
        return Vec::new();
    }
    let segments: Vec<(ObjectId, Segment)> = objects
        .iter()
        .flat_map(|(id, geometry)| geometry.segments.iter().map(move |s| (*id, *s)))
        .filter(|(_, s)| !segment_is_degenerate(s) && scope.admits(s))
        .collect();

    let mut out = Vec::new();
    for (i, (id, a)) in segments.iter().enumerate() {
        for (_, b) in &segments[i + 1..] {
            let Some(point) = intersect_segments(a, b) else {
                continue;
            };
            let at_end = |s: &Segment| points_coincide(point, s.p0) || points_coincide(point, s.p1);
            if at_end(a) && at_end(b) {
                continue;
            }
            out.push(SnapCandidate::point(point, SnapTarget::PathIntersection, Some(*id)).always(always_snap));
        }
    }
    out
}
