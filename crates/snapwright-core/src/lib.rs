//! Snapwright Core Library
//!
//! Snapping engine for vector drawing tools. Given a point being dragged, it
//! finds the nearest "interesting" location (object nodes, bounding box
//! corners, path intersections, grid lines, guides, page borders) within a
//! tolerance and reports where the point should go.
//!
//! The engine does not render and does not own the document: hosts expose
//! their scene through [`DocumentModel`] and [`CanvasLayout`], drive drags
//! through [`SnapManager`], and draw whatever [`Indicator`] messages say.

pub mod candidate;
pub mod document;
pub mod geom;
pub mod grid;
pub mod indicator;
pub mod manager;
pub mod preferences;
pub mod providers;
pub mod results;
pub mod snapper;
pub mod transform;
pub mod view;

pub use candidate::{ExclusionSet, SnapCandidate, SnapCandidatePoint, SnapSource, SnapTarget, SnapperQuery, ToolContext};
pub use document::{CanvasLayout, DocumentModel, Guide, MemoryDocument, ObjectGeometry, ObjectId, Page};
pub use geom::{Line, Segment};
pub use grid::{GridConfig, GridError, GridKind};
pub use indicator::{Indicator, IndicatorMessage, LogIndicator};
pub use manager::{Scene, Session, SnapManager};
pub use preferences::{OptionValue, PreferenceError, SharedPreferences, SimpleGroup, SnapOption, SnapPreferences};
pub use results::{SnapResult, SnappedPoint};
pub use snapper::{Snapper, SnapperKind};
pub use transform::{Axis, PureTransform, TransformSnap};
pub use view::SnapView;
