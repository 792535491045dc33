//! Document collaborator interfaces and an in-memory document.
//!
//! The engine never owns document objects. It asks a [`DocumentModel`] for
//! the geometry of visible objects and a [`CanvasLayout`] for grids, guides
//! and pages, and holds nothing but [`ObjectId`] handles between calls.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::{bounds_of, rect_corners, rect_edges, rects_overlap, Line, Segment};
use crate::grid::GridConfig;

/// Weak handle to a document object, guide or page.
pub type ObjectId = Uuid;

/// Whether a path node is a sharp corner or a smooth join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    #[default]
    Cusp,
    Smooth,
}

/// A path vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub point: Point,
    #[serde(default)]
    pub kind: NodeKind,
}

impl Node {
    pub fn cusp(point: Point) -> Self {
        Self {
            point,
            kind: NodeKind::Cusp,
        }
    }

    pub fn smooth(point: Point) -> Self {
        Self {
            point,
            kind: NodeKind::Smooth,
        }
    }
}

/// Snappable geometry of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectGeometry {
    /// Path vertices and handle endpoints.
    pub nodes: Vec<Node>,
    /// Visual bounding box; absent for empty objects and groups.
    pub bbox: Option<Rect>,
    /// Path segments (curves are flattened by the document model).
    pub segments: Vec<Segment>,
    /// Anchor point of a text object.
    pub text_anchor: Option<Point>,
    /// Baseline of a text object.
    pub text_baseline: Option<Segment>,
}

impl ObjectGeometry {
    /// Closed rectangular path with four cusp nodes.
    pub fn rectangle(rect: Rect) -> Self {
        Self {
            nodes: rect_corners(rect).into_iter().map(Node::cusp).collect(),
            bbox: Some(rect),
            segments: rect_edges(rect).to_vec(),
            ..Default::default()
        }
    }

    /// Straight-line path through `points`, optionally closed.
    pub fn polyline(points: &[Point], closed: bool) -> Self {
        let mut segments: Vec<Segment> = points.windows(2).map(|w| Segment::new(w[0], w[1])).collect();
        if closed && points.len() > 2 {
            segments.push(Segment::new(points[points.len() - 1], points[0]));
        }
        Self {
            nodes: points.iter().copied().map(Node::cusp).collect(),
            bbox: bounds_of(points.iter().copied()),
            segments,
            ..Default::default()
        }
    }

    /// Object that only exposes a bounding box (images, clones).
    pub fn bbox_only(rect: Rect) -> Self {
        Self {
            bbox: Some(rect),
            ..Default::default()
        }
    }

    /// Single line of text with its anchor at the start of the baseline.
    pub fn text(anchor: Point, width: f64, font_size: f64) -> Self {
        let baseline = Segment::new(anchor, anchor + Vec2::new(width, 0.0));
        Self {
            bbox: Some(Rect::new(anchor.x, anchor.y - font_size, anchor.x + width, anchor.y)),
            text_anchor: Some(anchor),
            text_baseline: Some(baseline),
            ..Default::default()
        }
    }

    /// Mark the node at `index` as smooth.
    pub fn with_smooth_node(mut self, index: usize) -> Self {
        if let Some(node) = self.nodes.get_mut(index) {
            node.kind = NodeKind::Smooth;
        }
        self
    }

    /// Bounds of everything snappable on this object.
    pub fn bounds(&self) -> Option<Rect> {
        let points = self
            .nodes
            .iter()
            .map(|n| n.point)
            .chain(self.segments.iter().flat_map(|s| [s.p0, s.p1]))
            .chain(self.text_anchor)
            .chain(self.text_baseline.iter().flat_map(|s| [s.p0, s.p1]));
        match (bounds_of(points), self.bbox) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.bbox.is_none()
            && self.segments.is_empty()
            && self.text_anchor.is_none()
            && self.text_baseline.is_none()
    }
}

/// A user-placed guide line. Its origin is the guide's anchor handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    #[serde(default = "Uuid::new_v4")]
    pub id: ObjectId,
    pub line: Line,
}

impl Guide {
    pub fn new(line: Line) -> Self {
        Self {
            id: Uuid::new_v4(),
            line,
        }
    }

    pub fn origin(&self) -> Point {
        self.line.origin()
    }
}

/// A page rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "Uuid::new_v4")]
    pub id: ObjectId,
    pub rect: Rect,
}

/// Object-level queries the engine needs from the document.
pub trait DocumentModel {
    /// Objects whose geometry touches `viewport`, in traversal order.
    fn visible_objects(&self, viewport: Rect) -> Vec<ObjectId>;

    /// Snappable geometry of an object; `None` for stale handles.
    fn object_geometry(&self, id: ObjectId) -> Option<ObjectGeometry>;

    fn is_locked(&self, id: ObjectId) -> bool;

    fn is_hidden(&self, id: ObjectId) -> bool;

    /// Direct children of a group; empty for leaves.
    fn children(&self, id: ObjectId) -> Vec<ObjectId>;
}

/// Grids, guides and pages of the canvas.
pub trait CanvasLayout {
    fn active_grids(&self) -> Vec<GridConfig>;

    fn active_guides(&self) -> Vec<Guide>;

    fn page_rects(&self) -> Vec<Page>;
}

/// One object stored in a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryObject {
    #[serde(default = "Uuid::new_v4")]
    pub id: ObjectId,
    #[serde(default)]
    pub geometry: ObjectGeometry,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Child objects, for groups.
    #[serde(default)]
    pub children: Vec<ObjectId>,
}

/// Document kept entirely in memory, loadable from JSON.
///
/// Used by the command line tool and by tests; real editors implement
/// [`DocumentModel`] and [`CanvasLayout`] over their own object tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDocument {
    /// Objects in traversal order.
    pub objects: Vec<MemoryObject>,
    pub grids: Vec<GridConfig>,
    pub guides: Vec<Guide>,
    pub pages: Vec<Page>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its handle.
    pub fn add_object(&mut self, geometry: ObjectGeometry) -> ObjectId {
        let id = Uuid::new_v4();
        self.objects.push(MemoryObject {
            id,
            geometry,
            locked: false,
            hidden: false,
            children: Vec::new(),
        });
        id
    }

    /// Add a group over existing objects.
    pub fn add_group(&mut self, children: Vec<ObjectId>) -> ObjectId {
        let id = Uuid::new_v4();
        self.objects.push(MemoryObject {
            id,
            geometry: ObjectGeometry::default(),
            locked: false,
            hidden: false,
            children,
        });
        id
    }

    /// Remove an object. Handles to it become stale.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        for object in &mut self.objects {
            object.children.retain(|c| *c != id);
        }
        self.objects.len() != before
    }

    pub fn add_grid(&mut self, grid: GridConfig) {
        self.grids.push(grid);
    }

    pub fn add_guide(&mut self, line: Line) -> ObjectId {
        let guide = Guide::new(line);
        self.guides.push(guide);
        guide.id
    }

    pub fn add_page(&mut self, rect: Rect) -> ObjectId {
        let id = Uuid::new_v4();
        self.pages.push(Page { id, rect });
        id
    }

    pub fn set_locked(&mut self, id: ObjectId, locked: bool) {
        if let Some(object) = self.object_mut(id) {
            object.locked = locked;
        }
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) {
        if let Some(object) = self.object_mut(id) {
            object.hidden = hidden;
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut MemoryObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|o| o.children.contains(&id))
            .map(|o| o.id)
    }

    /// Check if the document has no objects, grids, guides or pages.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.grids.is_empty() && self.guides.is_empty() && self.pages.is_empty()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl DocumentModel for MemoryDocument {
    fn visible_objects(&self, viewport: Rect) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| !self.is_hidden(o.id))
            .filter(|o| o.geometry.bounds().is_some_and(|b| rects_overlap(b, viewport)))
            .map(|o| o.id)
            .collect()
    }

    fn object_geometry(&self, id: ObjectId) -> Option<ObjectGeometry> {
        self.object(id).map(|o| o.geometry.clone())
    }

    fn is_locked(&self, id: ObjectId) -> bool {
        self.object(id).is_some_and(|o| o.locked)
    }

    /// Hidden when the object or any ancestor is hidden.
    fn is_hidden(&self, id: ObjectId) -> bool {
        let mut current = Some(id);
        let mut depth = 0;
        while let Some(id) = current {
            if self.object(id).is_some_and(|o| o.hidden) {
                return true;
            }
            // Guard against cycles in hand-written scene files.
            depth += 1;
            if depth > self.objects.len() {
                break;
            }
            current = self.parent(id);
        }
        false
    }

    fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.object(id).map(|o| o.children.clone()).unwrap_or_default()
    }
}

impl CanvasLayout for MemoryDocument {
    fn active_grids(&self) -> Vec<GridConfig> {
        self.grids.iter().filter(|g| g.enabled).cloned().collect()
    }

    fn active_guides(&self) -> Vec<Guide> {
        self.guides.clone()
    }

    fn page_rects(&self) -> Vec<Page> {
        self.pages.clone()
    }
}
