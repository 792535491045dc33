//! Grid configuration.
//!
//! A grid is persistent document metadata: origin, spacing, rotation and,
//! for axonometric grids, the angles of the two slanted axes. The third
//! axis is always vertical.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::EPSILON;

/// Default spacing of a new grid, in document units.
pub const DEFAULT_GRID_SPACING: f64 = 20.0;

/// Default number of minor cells between major lines.
pub const DEFAULT_MAJOR_INTERVAL: u32 = 5;

/// Smallest on-screen cell size (in pixels) still considered visible.
pub const MIN_VISIBLE_CELL_PX: f64 = 8.0;

/// Errors for grid configurations that cannot produce lines.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Grid spacing must be positive, got {0}")]
    NonPositiveSpacing(f64),

    #[error("Grid {0} is not finite")]
    NonFinite(&'static str),

    #[error("Axonometric axes are degenerate (angle_x = {angle_x}, angle_z = {angle_z})")]
    DegenerateAxes { angle_x: f64, angle_z: f64 },
}

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;

/// Grid geometry variant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridKind {
    #[default]
    Rectangular,
    /// Angles of the x and z axes from the horizontal, in degrees.
    Axonometric { angle_x: f64, angle_z: f64 },
}

/// A named grid stored with the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin: Point,
    /// Cell size per axis. Axonometric grids only use `y`.
    pub spacing: Vec2,
    #[serde(default)]
    pub kind: GridKind,
    /// Rotation about the origin, in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_major_interval")]
    pub major_interval: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_major_interval() -> u32 {
    DEFAULT_MAJOR_INTERVAL
}

fn default_enabled() -> bool {
    true
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::rectangular(Point::ZERO, Vec2::new(DEFAULT_GRID_SPACING, DEFAULT_GRID_SPACING))
    }
}

impl GridConfig {
    /// Create a rectangular grid.
    pub fn rectangular(origin: Point, spacing: Vec2) -> Self {
        Self {
            name: String::new(),
            origin,
            spacing,
            kind: GridKind::Rectangular,
            rotation: 0.0,
            major_interval: DEFAULT_MAJOR_INTERVAL,
            enabled: true,
        }
    }

    /// Create an axonometric grid with vertical spacing `spacing_y`.
    pub fn axonometric(origin: Point, spacing_y: f64, angle_x: f64, angle_z: f64) -> Self {
        Self {
            kind: GridKind::Axonometric { angle_x, angle_z },
            ..Self::rectangular(origin, Vec2::new(spacing_y, spacing_y))
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_major_interval(mut self, interval: u32) -> Self {
        self.major_interval = interval;
        self
    }

    pub fn is_axonometric(&self) -> bool {
        matches!(self.kind, GridKind::Axonometric { .. })
    }

    /// Check that the grid can produce lines.
    pub fn validate(&self) -> GridResult<()> {
        if !self.origin.x.is_finite() || !self.origin.y.is_finite() {
            return Err(GridError::NonFinite("origin"));
        }
        if !self.rotation.is_finite() {
            return Err(GridError::NonFinite("rotation"));
        }
        let spacings: &[f64] = match self.kind {
            GridKind::Rectangular => &[self.spacing.x, self.spacing.y],
            GridKind::Axonometric { .. } => &[self.spacing.y],
        };
        for &s in spacings {
            if !s.is_finite() {
                return Err(GridError::NonFinite("spacing"));
            }
            if s <= 0.0 {
                return Err(GridError::NonPositiveSpacing(s));
            }
        }
        if let GridKind::Axonometric { angle_x, angle_z } = self.kind {
            let usable = |a: f64| a.is_finite() && (0.0..90.0).contains(&a);
            if !usable(angle_x) || !usable(angle_z) || self.axonometric_tangents().is_none() {
                return Err(GridError::DegenerateAxes { angle_x, angle_z });
            }
        }
        Ok(())
    }

    /// Tangents of the x and z axis angles; `None` if they cannot span a grid.
    pub fn axonometric_tangents(&self) -> Option<(f64, f64)> {
        match self.kind {
            GridKind::Axonometric { angle_x, angle_z } => {
                let ta_x = angle_x.to_radians().tan();
                let ta_z = angle_z.to_radians().tan();
                (ta_x + ta_z > EPSILON).then_some((ta_x, ta_z))
            }
            GridKind::Rectangular => None,
        }
    }

    /// Transform from document space into the unrotated grid frame.
    pub fn to_grid_frame(&self) -> Affine {
        Affine::rotate_about(-self.rotation.to_radians(), self.origin)
    }

    /// Transform from the unrotated grid frame back to document space.
    pub fn from_grid_frame(&self) -> Affine {
        Affine::rotate_about(self.rotation.to_radians(), self.origin)
    }

    /// Spacing along the axis that visible-only scaling is measured on.
    pub fn reference_spacing(&self) -> f64 {
        match self.kind {
            GridKind::Rectangular => self.spacing.x.min(self.spacing.y),
            GridKind::Axonometric { .. } => self.spacing.y,
        }
    }
}

/// Multiplier that makes a grid cell of `length` screen pixels visible.
///
/// The first step jumps to the major line interval, later steps double.
pub fn calculate_scaling_factor(length: f64, major: u32) -> u32 {
    let mut multiply: u32 = 1;
    let mut step = major.max(1);
    let mut watchdog = 0;

    while length * f64::from(multiply) < MIN_VISIBLE_CELL_PX && watchdog < 100 {
        multiply = multiply.saturating_mul(step);
        step = 2;
        watchdog += 1;
    }

    multiply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rectangular() {
        assert!(GridConfig::default().validate().is_ok());

        let zero = GridConfig::rectangular(Point::ZERO, Vec2::new(0.0, 5.0));
        assert_eq!(zero.validate(), Err(GridError::NonPositiveSpacing(0.0)));

        let nan = GridConfig::rectangular(Point::new(f64::NAN, 0.0), Vec2::new(5.0, 5.0));
        assert_eq!(nan.validate(), Err(GridError::NonFinite("origin")));
    }

    #[test]
    fn test_validate_axonometric() {
        assert!(GridConfig::axonometric(Point::ZERO, 10.0, 30.0, 30.0).validate().is_ok());

        let flat = GridConfig::axonometric(Point::ZERO, 10.0, 0.0, 0.0);
        assert!(matches!(flat.validate(), Err(GridError::DegenerateAxes { .. })));

        let steep = GridConfig::axonometric(Point::ZERO, 10.0, 90.0, 30.0);
        assert!(matches!(steep.validate(), Err(GridError::DegenerateAxes { .. })));
    }

    #[test]
    fn test_scaling_factor() {
        // Already visible
        assert_eq!(calculate_scaling_factor(10.0, 5), 1);
        // 2px cells jump to the major interval first
        assert_eq!(calculate_scaling_factor(2.0, 5), 5);
        // 1px cells: 5 is not enough, then double
        assert_eq!(calculate_scaling_factor(1.0, 5), 10);
        // Major interval of zero behaves like one
        assert_eq!(calculate_scaling_factor(3.0, 0), 4);
    }

    #[test]
    fn test_scaling_factor_watchdog() {
        assert!(calculate_scaling_factor(0.0, 5) > 1);
    }

    #[test]
    fn test_grid_frame_roundtrip() {
        let grid = GridConfig::rectangular(Point::new(3.0, 4.0), Vec2::new(5.0, 5.0)).with_rotation(30.0);
        let p = Point::new(12.0, -7.0);
        let back = grid.from_grid_frame() * (grid.to_grid_frame() * p);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_grid_json_defaults() {
        let grid: GridConfig = serde_json::from_str(r#"{ "spacing": { "x": 5.0, "y": 5.0 } }"#).unwrap();
        assert_eq!(grid.kind, GridKind::Rectangular);
        assert_eq!(grid.major_interval, DEFAULT_MAJOR_INTERVAL);
        assert!(grid.enabled);
    }
}
