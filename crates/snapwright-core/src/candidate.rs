//! Snap candidates and the queries that look for them.
//!
//! A [`SnapTarget`] says what kind of feature a candidate is (a cusp node, a
//! grid line, a page corner...). A [`SnapSource`] says what kind of point is
//! being dragged. The priority table that breaks distance ties lives in
//! [`SnapTarget::priority`] and nowhere else.

use std::collections::HashSet;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentModel, ObjectId};
use crate::geom::{Line, Segment};

/// Kind of point being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapSource {
    #[default]
    Undefined,
    BBoxCorner,
    BBoxMidpoint,
    BBoxEdgeMidpoint,
    NodeCusp,
    NodeSmooth,
    LineMidpoint,
    TextAnchor,
    RotationCenter,
    Guide,
    GuideOrigin,
    PageCorner,
    /// A translation vector being rounded to the grid pitch.
    GridPitch,
    OtherHandle,
}

impl SnapSource {
    /// Sources that belong to a bounding box of the selection.
    pub fn is_bbox(self) -> bool {
        matches!(
            self,
            SnapSource::BBoxCorner | SnapSource::BBoxMidpoint | SnapSource::BBoxEdgeMidpoint
        )
    }

    /// Sources that are path nodes or lie on a path.
    pub fn is_node(self) -> bool {
        matches!(
            self,
            SnapSource::NodeCusp | SnapSource::NodeSmooth | SnapSource::LineMidpoint
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            SnapSource::Undefined => "point",
            SnapSource::BBoxCorner => "bounding box corner",
            SnapSource::BBoxMidpoint => "bounding box midpoint",
            SnapSource::BBoxEdgeMidpoint => "bounding box side midpoint",
            SnapSource::NodeCusp => "cusp node",
            SnapSource::NodeSmooth => "smooth node",
            SnapSource::LineMidpoint => "line midpoint",
            SnapSource::TextAnchor => "text anchor",
            SnapSource::RotationCenter => "rotation center",
            SnapSource::Guide => "guide",
            SnapSource::GuideOrigin => "guide origin",
            SnapSource::PageCorner => "page corner",
            SnapSource::GridPitch => "multiple of grid spacing",
            SnapSource::OtherHandle => "handle",
        }
    }
}

/// Kind of feature a candidate represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapTarget {
    #[default]
    Undefined,
    BBoxCorner,
    BBoxEdge,
    BBoxEdgeMidpoint,
    BBoxMidpoint,
    NodeCusp,
    NodeSmooth,
    Path,
    PathIntersection,
    PathGuideIntersection,
    LineMidpoint,
    TextAnchor,
    TextBaseline,
    Grid,
    GridIntersection,
    GridPerpendicular,
    GridGuideIntersection,
    Guide,
    GuideIntersection,
    GuideOrigin,
    GuidePerpendicular,
    PageBorder,
    PageCorner,
    /// Sharing an x or y coordinate with another object's bbox corner.
    AlignmentBBoxCorner,
    AlignmentBBoxMidpoint,
    AlignmentPageCorner,
    AlignmentPageCenter,
    /// Aligned on both axes at once, with two different targets.
    AlignmentIntersection,
    /// Centred between the nearest neighbours on the left and right.
    DistributionX,
    /// Centred between the nearest neighbours above and below.
    DistributionY,
    /// Same gap to the neighbour on the right as that neighbour has to the next.
    DistributionRight,
    DistributionLeft,
    DistributionUp,
    DistributionDown,
    /// Equally spaced along both axes.
    DistributionXY,
    /// Not a feature: the point was only projected onto a constraint line.
    Constraint,
    /// Not a feature: the point was only projected onto an angular constraint.
    ConstrainedAngle,
}

impl SnapTarget {
    /// Rank used to break distance ties. Lower wins.
    ///
    /// Object nodes, then intersections, then bounding boxes, then grids,
    /// then guides, then pages. Alignment and distribution only fix the
    /// position relative to other objects and rank last among features.
    pub fn priority(self) -> u8 {
        match self {
            SnapTarget::NodeCusp | SnapTarget::NodeSmooth => 0,
            SnapTarget::PathIntersection | SnapTarget::PathGuideIntersection => 1,
            SnapTarget::BBoxCorner => 2,
            SnapTarget::BBoxEdgeMidpoint => 3,
            SnapTarget::BBoxMidpoint | SnapTarget::LineMidpoint | SnapTarget::TextAnchor => 4,
            SnapTarget::BBoxEdge | SnapTarget::Path | SnapTarget::TextBaseline => 5,
            SnapTarget::GridIntersection | SnapTarget::GridGuideIntersection => 6,
            SnapTarget::Grid | SnapTarget::GridPerpendicular => 7,
            SnapTarget::GuideIntersection | SnapTarget::GuideOrigin => 8,
            SnapTarget::Guide | SnapTarget::GuidePerpendicular => 9,
            SnapTarget::PageCorner => 10,
            SnapTarget::PageBorder => 11,
            SnapTarget::AlignmentIntersection | SnapTarget::DistributionXY => 12,
            SnapTarget::AlignmentBBoxCorner
            | SnapTarget::AlignmentBBoxMidpoint
            | SnapTarget::AlignmentPageCorner
            | SnapTarget::AlignmentPageCenter
            | SnapTarget::DistributionX
            | SnapTarget::DistributionY
            | SnapTarget::DistributionRight
            | SnapTarget::DistributionLeft
            | SnapTarget::DistributionUp
            | SnapTarget::DistributionDown => 13,
            SnapTarget::Constraint | SnapTarget::ConstrainedAngle | SnapTarget::Undefined => 14,
        }
    }

    /// Targets that lie on a path; the only ones allowed when inserting a node.
    pub fn is_on_path(self) -> bool {
        matches!(
            self,
            SnapTarget::LineMidpoint
                | SnapTarget::Path
                | SnapTarget::PathIntersection
                | SnapTarget::PathGuideIntersection
        )
    }

    /// Human readable label, used by indicator messages.
    pub fn description(self) -> &'static str {
        match self {
            SnapTarget::Undefined => "undefined",
            SnapTarget::BBoxCorner => "bounding box corner",
            SnapTarget::BBoxEdge => "bounding box side",
            SnapTarget::BBoxEdgeMidpoint => "bounding box side midpoint",
            SnapTarget::BBoxMidpoint => "bounding box midpoint",
            SnapTarget::NodeCusp => "cusp node",
            SnapTarget::NodeSmooth => "smooth node",
            SnapTarget::Path => "path",
            SnapTarget::PathIntersection => "path intersection",
            SnapTarget::PathGuideIntersection => "guide-path intersection",
            SnapTarget::LineMidpoint => "line midpoint",
            SnapTarget::TextAnchor => "text anchor",
            SnapTarget::TextBaseline => "text baseline",
            SnapTarget::Grid => "grid line",
            SnapTarget::GridIntersection => "grid intersection",
            SnapTarget::GridPerpendicular => "grid line (perpendicular)",
            SnapTarget::GridGuideIntersection => "grid-guide intersection",
            SnapTarget::Guide => "guide",
            SnapTarget::GuideIntersection => "guide intersection",
            SnapTarget::GuideOrigin => "guide origin",
            SnapTarget::GuidePerpendicular => "guide (perpendicular)",
            SnapTarget::PageBorder => "page border",
            SnapTarget::PageCorner => "page corner",
            SnapTarget::AlignmentBBoxCorner => "alignment with bounding box corner",
            SnapTarget::AlignmentBBoxMidpoint => "alignment with bounding box midpoint",
            SnapTarget::AlignmentPageCorner => "alignment with page corner",
            SnapTarget::AlignmentPageCenter => "alignment with page center",
            SnapTarget::AlignmentIntersection => "alignment intersection",
            SnapTarget::DistributionX => "equal horizontal distance",
            SnapTarget::DistributionY => "equal vertical distance",
            SnapTarget::DistributionRight => "equal distance to the right",
            SnapTarget::DistributionLeft => "equal distance to the left",
            SnapTarget::DistributionUp => "equal distance above",
            SnapTarget::DistributionDown => "equal distance below",
            SnapTarget::DistributionXY => "equal distance in both directions",
            SnapTarget::Constraint => "constraint",
            SnapTarget::ConstrainedAngle => "constrained angle",
        }
    }
}

/// Geometry of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateGeometry {
    /// A point feature (node, corner, intersection).
    Point(Point),
    /// An infinite line (grid line, guide).
    Line(Line),
    /// A finite piece of path or box edge.
    Segment(Segment),
}

/// One categorized snap target produced by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    pub geometry: CandidateGeometry,
    pub target: SnapTarget,
    /// Weak handle to the originating object, for exclusion and reporting.
    pub object: Option<ObjectId>,
    /// Exempt from the tolerance check.
    pub always_snap: bool,
}

impl SnapCandidate {
    pub fn point(point: Point, target: SnapTarget, object: Option<ObjectId>) -> Self {
        Self {
            geometry: CandidateGeometry::Point(point),
            target,
            object,
            always_snap: false,
        }
    }

    pub fn line(line: Line, target: SnapTarget, object: Option<ObjectId>) -> Self {
        Self {
            geometry: CandidateGeometry::Line(line),
            target,
            object,
            always_snap: false,
        }
    }

    pub fn segment(segment: Segment, target: SnapTarget, object: Option<ObjectId>) -> Self {
        Self {
            geometry: CandidateGeometry::Segment(segment),
            target,
            object,
            always_snap: false,
        }
    }

    /// Mark the candidate as always-snap.
    pub fn always(mut self, always_snap: bool) -> Self {
        self.always_snap = always_snap;
        self
    }
}

/// A point being dragged, with what it is and where its segment starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidatePoint {
    pub point: Point,
    pub source: SnapSource,
    /// Other end of the segment being drawn, used for perpendicular snaps.
    pub origin: Option<Point>,
}

impl SnapCandidatePoint {
    pub fn new(point: Point, source: SnapSource) -> Self {
        Self {
            point,
            source,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Active tool, which decides which snappers are even asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolContext {
    #[default]
    Selector,
    NodeEditor,
    Drawing,
    GuidePlacement,
    PageEditor,
    /// Pan/zoom; never snaps.
    Navigation,
}

/// Input of one snap request.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapperQuery {
    /// Points being dragged; several for multi-point transforms.
    pub points: Vec<SnapCandidatePoint>,
    /// Line the drag is locked to, if any.
    pub constraint: Option<Line>,
    /// Objects that must not be snapped to (descendants included).
    pub exclusions: Vec<ObjectId>,
    pub tool: ToolContext,
    /// Only accept targets lying on a path (node insertion).
    pub to_paths_only: bool,
    /// Bounding box of the dragged selection, for distribution snapping.
    pub bbox: Option<Rect>,
}

impl SnapperQuery {
    /// Query for a single point of undefined kind.
    pub fn point(point: Point) -> Self {
        Self::with_points(vec![SnapCandidatePoint::new(point, SnapSource::Undefined)])
    }

    pub fn with_points(points: Vec<SnapCandidatePoint>) -> Self {
        Self {
            points,
            constraint: None,
            exclusions: Vec::new(),
            tool: ToolContext::default(),
            to_paths_only: false,
            bbox: None,
        }
    }

    /// Set the source kind of every point.
    pub fn source(mut self, source: SnapSource) -> Self {
        for point in &mut self.points {
            point.source = source;
        }
        self
    }

    pub fn tool(mut self, tool: ToolContext) -> Self {
        self.tool = tool;
        self
    }

    pub fn exclude(mut self, id: ObjectId) -> Self {
        self.exclusions.push(id);
        self
    }

    pub fn constrained(mut self, line: Line) -> Self {
        self.constraint = Some(line);
        self
    }

    pub fn paths_only(mut self) -> Self {
        self.to_paths_only = true;
        self
    }

    pub fn selection_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// The selection's bounding box, or the bounds of the dragged points.
    pub fn dragged_bbox(&self) -> Option<Rect> {
        self.bbox.or_else(|| query_bounds(&self.points))
    }

    /// A single dragged handle (as opposed to a transformed selection).
    pub fn is_single_handle(&self) -> bool {
        self.points.len() == 1
    }
}

/// Exclusion set expanded to every descendant, matched by id.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    ids: HashSet<ObjectId>,
}

impl ExclusionSet {
    /// Expand `roots` and all their descendants.
    pub fn expand(roots: &[ObjectId], document: &dyn DocumentModel) -> Self {
        let mut ids = HashSet::new();
        let mut stack: Vec<ObjectId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            if ids.insert(id) {
                stack.extend(document.children(id));
            }
        }
        Self { ids }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Check an optional handle; anonymous candidates are never excluded.
    pub fn excludes(&self, id: Option<ObjectId>) -> bool {
        id.is_some_and(|id| self.ids.contains(&id))
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Bounding box of all dragged points.
pub fn query_bounds(points: &[SnapCandidatePoint]) -> Option<Rect> {
    crate::geom::bounds_of(points.iter().map(|p| p.point))
}
