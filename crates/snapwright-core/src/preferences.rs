//! Snapping preferences.
//!
//! Every toggle and tolerance is a [`SnapOption`] with a stable string name
//! (`"snap/object/nodes"`, `"snap/grid/enabled"`, ...). Preferences belong to
//! a document and are shared between its views through
//! [`SharedPreferences`]; views subscribe to changes instead of polling.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::{SnapSource, SnapTarget};

/// Default object snapping tolerance, in screen pixels.
pub const DEFAULT_OBJECT_TOLERANCE: f64 = 10.0;

/// Default grid snapping tolerance, in screen pixels.
pub const DEFAULT_GRID_TOLERANCE: f64 = 10.0;

/// Default guide snapping tolerance, in screen pixels.
pub const DEFAULT_GUIDE_TOLERANCE: f64 = 20.0;

/// Default alignment and distribution tolerance, in screen pixels.
pub const DEFAULT_ALIGNMENT_TOLERANCE: f64 = 5.0;

/// Default time a snap indicator stays visible, in seconds.
pub const DEFAULT_INDICATOR_PERSISTENCE: f64 = 2.0;

/// Shortest indicator persistence; zero is bumped to this.
pub const MIN_INDICATOR_PERSISTENCE: f64 = 0.1;

/// A tolerance at or above this many pixels means "always snap".
pub const ALWAYS_SNAP_TOLERANCE: f64 = 10000.0;

/// Preference errors.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Unknown snapping option: {0}")]
    UnknownOption(String),
    #[error("Option {option} expects a {expected} value")]
    TypeMismatch { option: String, expected: &'static str },
    #[error("Invalid value for {option}: {reason}")]
    InvalidValue { option: String, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for preference operations.
pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Value of a snapping option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
}

impl OptionValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(b),
            OptionValue::Number(_) => None,
        }
    }

    pub fn as_number(self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(n),
            OptionValue::Bool(_) => None,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "boolean",
            OptionValue::Number(_) => "numeric",
        }
    }

    fn same_type(self, other: OptionValue) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<f64> for OptionValue {
    fn from(n: f64) -> Self {
        OptionValue::Number(n)
    }
}

macro_rules! snap_options {
    ($($variant:ident => $name:literal = $default:expr,)*) => {
        /// A named snapping preference.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum SnapOption {
            $($variant,)*
        }

        impl SnapOption {
            /// Every option, in declaration order.
            pub const ALL: &'static [SnapOption] = &[$(SnapOption::$variant,)*];

            /// Stable string key.
            pub fn name(self) -> &'static str {
                match self {
                    $(SnapOption::$variant => $name,)*
                }
            }

            /// Look up an option by its string key.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(SnapOption::$variant),)*
                    _ => None,
                }
            }

            /// Value used for fresh preferences.
            pub fn default_value(self) -> OptionValue {
                match self {
                    $(SnapOption::$variant => OptionValue::from($default),)*
                }
            }
        }
    };
}

snap_options! {
    Enabled => "snap/enabled" = true,
    SimpleMode => "snap/simpleMode" = true,
    BBoxEnabled => "snap/bbox/enabled" = true,
    BBoxEdges => "snap/bbox/edges" = true,
    BBoxCorners => "snap/bbox/corners" = true,
    BBoxEdgeMidpoints => "snap/bbox/edgeMidpoints" = false,
    BBoxCenters => "snap/bbox/centers" = false,
    NodesEnabled => "snap/object/nodes" = true,
    Paths => "snap/object/paths" = true,
    PathIntersections => "snap/object/pathIntersections" = false,
    CuspNodes => "snap/object/cuspNodes" = true,
    SmoothNodes => "snap/object/smoothNodes" = true,
    LineMidpoints => "snap/object/lineMidpoints" = true,
    Perpendicular => "snap/perpendicular" = false,
    OthersEnabled => "snap/others/enabled" = true,
    TextBaseline => "snap/others/textBaseline" = true,
    PageBorder => "snap/page/border" = true,
    GridEnabled => "snap/grid/enabled" = true,
    GridLines => "snap/grid/lines" = true,
    GridVisibleOnly => "snap/grid/visibleOnly" = true,
    GridAlwaysSnap => "snap/grid/alwaysSnap" = false,
    GuideEnabled => "snap/guide/enabled" = true,
    GuideAlwaysSnap => "snap/guide/alwaysSnap" = false,
    AlignmentEnabled => "snap/alignment/enabled" = false,
    DistributionEnabled => "snap/distribution/enabled" = false,
    ObjectAlwaysSnap => "snap/object/alwaysSnap" = false,
    AlwaysSnapIntersections => "snap/alwaysSnapIntersections" = false,
    PreferPoints => "snap/preferPoints" = false,
    MousePointer => "snap/mousePointer" = false,
    IndicatorEnabled => "snap/indicator/enabled" = true,
    ObjectTolerance => "snap/tolerance/object" = DEFAULT_OBJECT_TOLERANCE,
    GridTolerance => "snap/tolerance/grid" = DEFAULT_GRID_TOLERANCE,
    GuideTolerance => "snap/tolerance/guide" = DEFAULT_GUIDE_TOLERANCE,
    AlignmentTolerance => "snap/tolerance/alignment" = DEFAULT_ALIGNMENT_TOLERANCE,
    DistributionTolerance => "snap/tolerance/distribution" = DEFAULT_ALIGNMENT_TOLERANCE,
    IndicatorPersistence => "snap/indicator/persistence" = DEFAULT_INDICATOR_PERSISTENCE,
}

impl fmt::Display for SnapOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Groups of options that simple mode collapses into one toggle each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleGroup {
    BBox,
    Nodes,
    /// Everything without its own simple toggle.
    Rest,
}

impl SimpleGroup {
    /// Members of the group with their simple-mode value when the group is on.
    ///
    /// The first member is the group's own category toggle.
    pub fn members(self) -> &'static [(SnapOption, bool)] {
        match self {
            SimpleGroup::BBox => &[
                (SnapOption::BBoxEnabled, true),
                (SnapOption::BBoxEdges, true),
                (SnapOption::BBoxCorners, true),
                (SnapOption::BBoxEdgeMidpoints, false),
                (SnapOption::BBoxCenters, false),
            ],
            SimpleGroup::Nodes => &[
                (SnapOption::NodesEnabled, true),
                (SnapOption::Paths, true),
                (SnapOption::PathIntersections, false),
                (SnapOption::CuspNodes, true),
                (SnapOption::SmoothNodes, true),
                (SnapOption::LineMidpoints, true),
                (SnapOption::Perpendicular, false),
            ],
            SimpleGroup::Rest => &[
                (SnapOption::OthersEnabled, true),
                (SnapOption::TextBaseline, true),
                (SnapOption::PageBorder, true),
                (SnapOption::GridEnabled, true),
                (SnapOption::GridLines, true),
                (SnapOption::GuideEnabled, true),
                (SnapOption::AlignmentEnabled, false),
                (SnapOption::DistributionEnabled, false),
            ],
        }
    }
}

/// A single preference mutation, delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceChange {
    pub option: SnapOption,
    pub old: OptionValue,
    pub new: OptionValue,
}

/// Handle returned by [`SnapPreferences::subscribe`].
pub type SubscriptionId = u64;

type Observer = Box<dyn FnMut(&PreferenceChange)>;

/// Preferences shared by every view of one document.
pub type SharedPreferences = Rc<RefCell<SnapPreferences>>;

/// Document-scoped snapping configuration.
pub struct SnapPreferences {
    values: BTreeMap<SnapOption, OptionValue>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
}

impl fmt::Debug for SnapPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapPreferences")
            .field("values", &self.values)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for SnapPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapPreferences {
    /// Preferences with every option at its default.
    pub fn new() -> Self {
        Self {
            values: SnapOption::ALL
                .iter()
                .map(|&option| (option, option.default_value()))
                .collect(),
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Wrap into a handle shareable between views.
    pub fn shared(self) -> SharedPreferences {
        Rc::new(RefCell::new(self))
    }

    fn value(&self, option: SnapOption) -> OptionValue {
        self.values
            .get(&option)
            .copied()
            .unwrap_or_else(|| option.default_value())
    }

    /// Read an option by name.
    pub fn get(&self, name: &str) -> PreferenceResult<OptionValue> {
        let option = SnapOption::from_name(name).ok_or_else(|| PreferenceError::UnknownOption(name.to_string()))?;
        Ok(self.value(option))
    }

    /// Write an option by name. The value type must match the option.
    pub fn set(&mut self, name: &str, value: OptionValue) -> PreferenceResult<()> {
        let option = SnapOption::from_name(name).ok_or_else(|| PreferenceError::UnknownOption(name.to_string()))?;
        self.set_option(option, value)
    }

    /// Write an option after checking its type and range.
    pub fn set_option(&mut self, option: SnapOption, value: OptionValue) -> PreferenceResult<()> {
        validate(option, value)?;
        self.store(option, value);
        Ok(())
    }

    fn store(&mut self, option: SnapOption, value: OptionValue) {
        let old = self.value(option);
        if old == value {
            return;
        }
        self.values.insert(option, value);
        log::debug!("Snap preference {} changed to {:?}", option, value);
        let change = PreferenceChange {
            option,
            old,
            new: value,
        };
        for (_, observer) in &mut self.observers {
            observer(&change);
        }
    }

    /// Boolean value of an option; `false` for numeric options.
    pub fn bool(&self, option: SnapOption) -> bool {
        self.value(option).as_bool().unwrap_or(false)
    }

    /// Numeric value of an option; `0.0` for boolean options.
    pub fn number(&self, option: SnapOption) -> f64 {
        self.value(option).as_number().unwrap_or(0.0)
    }

    /// Set a boolean option. Numeric options are left untouched.
    pub fn set_bool(&mut self, option: SnapOption, value: bool) {
        if option.default_value().as_bool().is_some() {
            self.store(option, OptionValue::Bool(value));
        }
    }

    /// Set a numeric option.
    pub fn set_number(&mut self, option: SnapOption, value: f64) -> PreferenceResult<()> {
        self.set_option(option, OptionValue::Number(value))
    }

    /// Register a change observer.
    pub fn subscribe(&mut self, observer: impl FnMut(&PreferenceChange) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    pub fn is_enabled(&self) -> bool {
        self.bool(SnapOption::Enabled)
    }

    pub fn is_simple_mode(&self) -> bool {
        self.bool(SnapOption::SimpleMode)
    }

    /// Switch between simple and advanced mode.
    ///
    /// Entering simple mode runs [`transition_to_simple`](Self::transition_to_simple);
    /// leaving it keeps every fine-grained toggle as it is.
    pub fn set_simple_mode(&mut self, simple: bool) {
        if simple {
            self.transition_to_simple();
        } else {
            self.set_bool(SnapOption::SimpleMode, false);
        }
    }

    /// Collapse the advanced toggles into simple mode.
    ///
    /// The bounding box and node groups stay on only if their advanced
    /// category toggle was on. Members of an enabled group take their
    /// simple-mode value, so advanced-only targets such as path
    /// intersections are always switched off. Everything else is reset to
    /// its simple-mode value.
    pub fn transition_to_simple(&mut self) {
        let bbox = self.bool(SnapOption::BBoxEnabled);
        let nodes = self.bool(SnapOption::NodesEnabled);
        self.set_simple_snap(SimpleGroup::BBox, bbox);
        self.set_simple_snap(SimpleGroup::Nodes, nodes);
        self.set_simple_snap(SimpleGroup::Rest, true);
        self.set_bool(SnapOption::SimpleMode, true);
        log::debug!("Snap preferences switched to simple mode (bbox: {}, nodes: {})", bbox, nodes);
    }

    /// Turn a simple-mode group on or off.
    pub fn set_simple_snap(&mut self, group: SimpleGroup, enabled: bool) {
        for &(option, simple_value) in group.members() {
            self.set_bool(option, enabled && simple_value);
        }
    }

    /// State of a simple-mode group (its category toggle).
    pub fn simple_snap(&self, group: SimpleGroup) -> bool {
        group.members().first().is_some_and(|&(option, _)| self.bool(option))
    }

    /// Whether candidates of `target` may be snapped to at all.
    pub fn is_target_snappable(&self, target: SnapTarget) -> bool {
        use SnapOption as O;
        if !self.is_enabled() {
            return false;
        }
        let bbox = |o| self.bool(O::BBoxEnabled) && self.bool(o);
        let nodes = |o| self.bool(O::NodesEnabled) && self.bool(o);
        let others = |o| self.bool(O::OthersEnabled) && self.bool(o);
        let grid = self.bool(O::GridEnabled);
        let guide = self.bool(O::GuideEnabled);
        let alignment = self.bool(O::AlignmentEnabled);
        let distribution = self.bool(O::DistributionEnabled);
        match target {
            SnapTarget::BBoxCorner => bbox(O::BBoxCorners),
            SnapTarget::BBoxEdge => bbox(O::BBoxEdges),
            SnapTarget::BBoxEdgeMidpoint => bbox(O::BBoxEdgeMidpoints),
            SnapTarget::BBoxMidpoint => bbox(O::BBoxCenters),
            SnapTarget::NodeCusp => nodes(O::CuspNodes),
            SnapTarget::NodeSmooth => nodes(O::SmoothNodes),
            SnapTarget::Path => nodes(O::Paths),
            SnapTarget::PathIntersection => nodes(O::PathIntersections),
            SnapTarget::LineMidpoint => nodes(O::LineMidpoints),
            SnapTarget::PathGuideIntersection => nodes(O::Paths) && guide,
            SnapTarget::TextAnchor | SnapTarget::TextBaseline => others(O::TextBaseline),
            SnapTarget::Grid => grid && self.bool(O::GridLines),
            SnapTarget::GridIntersection => grid,
            SnapTarget::GridPerpendicular => grid && self.bool(O::GridLines) && self.bool(O::Perpendicular),
            SnapTarget::GridGuideIntersection => grid && guide,
            SnapTarget::Guide | SnapTarget::GuideIntersection | SnapTarget::GuideOrigin => guide,
            SnapTarget::GuidePerpendicular => guide && self.bool(O::Perpendicular),
            SnapTarget::PageBorder | SnapTarget::PageCorner => self.bool(O::PageBorder),
            SnapTarget::AlignmentBBoxCorner | SnapTarget::AlignmentBBoxMidpoint | SnapTarget::AlignmentIntersection => {
                alignment
            }
            SnapTarget::AlignmentPageCorner | SnapTarget::AlignmentPageCenter => alignment && self.bool(O::PageBorder),
            SnapTarget::DistributionX
            | SnapTarget::DistributionY
            | SnapTarget::DistributionRight
            | SnapTarget::DistributionLeft
            | SnapTarget::DistributionUp
            | SnapTarget::DistributionDown
            | SnapTarget::DistributionXY => distribution,
            SnapTarget::Constraint | SnapTarget::ConstrainedAngle | SnapTarget::Undefined => true,
        }
    }

    /// Whether a dragged point of kind `source` may snap at all.
    pub fn is_source_snappable(&self, source: SnapSource) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if source.is_bbox() {
            return self.bool(SnapOption::BBoxEnabled);
        }
        if source.is_node() {
            return self.bool(SnapOption::NodesEnabled);
        }
        true
    }

    /// How long indicators stay visible, in seconds.
    pub fn indicator_persistence(&self) -> f64 {
        let seconds = self.number(SnapOption::IndicatorPersistence);
        if seconds <= 0.0 {
            MIN_INDICATOR_PERSISTENCE
        } else {
            seconds
        }
    }

    /// Flat `{ name: value }` map of every option.
    pub fn to_map(&self) -> BTreeMap<&'static str, OptionValue> {
        SnapOption::ALL
            .iter()
            .map(|&option| (option.name(), self.value(option)))
            .collect()
    }

    /// Serialize to the flat JSON object used for persistence.
    pub fn to_json(&self) -> PreferenceResult<String> {
        serde_json::to_string_pretty(&self.to_map()).map_err(|e| PreferenceError::Serialization(e.to_string()))
    }

    /// Parse preferences; options missing from `json` keep their defaults.
    pub fn from_json(json: &str) -> PreferenceResult<Self> {
        let mut prefs = Self::new();
        prefs.merge_json(json)?;
        Ok(prefs)
    }

    /// Apply every entry of a JSON object, notifying observers.
    ///
    /// All entries are checked before anything is applied.
    pub fn merge_json(&mut self, json: &str) -> PreferenceResult<()> {
        let entries: BTreeMap<String, OptionValue> =
            serde_json::from_str(json).map_err(|e| PreferenceError::Serialization(e.to_string()))?;
        let mut parsed = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let option = SnapOption::from_name(&name).ok_or(PreferenceError::UnknownOption(name))?;
            validate(option, value)?;
            parsed.push((option, value));
        }
        for (option, value) in parsed {
            self.store(option, value);
        }
        Ok(())
    }

    /// Write preferences to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> PreferenceResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| PreferenceError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Read preferences from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> PreferenceResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PreferenceError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

fn validate(option: SnapOption, value: OptionValue) -> PreferenceResult<()> {
    let expected = option.default_value();
    if !expected.same_type(value) {
        return Err(PreferenceError::TypeMismatch {
            option: option.name().to_string(),
            expected: expected.type_name(),
        });
    }
    if let OptionValue::Number(n) = value {
        if !n.is_finite() || n < 0.0 {
            return Err(PreferenceError::InvalidValue {
                option: option.name().to_string(),
                reason: format!("expected a finite non-negative number, got {}", n),
            });
        }
    }
    Ok(())
}
