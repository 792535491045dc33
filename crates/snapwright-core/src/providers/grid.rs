//! Grid line provider.
//!
//! Only the lines bracketing the query point are produced, never the whole
//! grid: two per axis for rectangular grids and the three sides of the
//! enclosing triangle for axonometric grids.

use kurbo::{Point, Vec2};

use super::SnapCache;
use crate::candidate::{SnapCandidate, SnapTarget};
use crate::geom::{Line, EPSILON};
use crate::grid::{calculate_scaling_factor, GridConfig, GridKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Left,
    Right,
    Both,
}

/// Grid cell containing the query point, as floor/ceil line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKey {
    Rectangular {
        x: [i64; 2],
        y: [i64; 2],
    },
    Axonometric {
        x: [i64; 2],
        z: [i64; 2],
        xp: [i64; 2],
        half: Half,
    },
}

/// Cached bracket of one grid, valid while the point stays in its cell.
#[derive(Debug, Clone)]
pub struct GridBracket {
    config: GridConfig,
    spacing: Vec2,
    key: CellKey,
    lines: Vec<Line>,
}

/// Indices of the two lines enclosing `value`. A value exactly on a line
/// still gets the next one, so every cell has two distinct sides.
fn bracket(value: f64, step: f64, offset: f64) -> [i64; 2] {
    let lower = ((value - offset) / step).floor() as i64;
    [lower, lower + 1]
}

fn at(index: i64, step: f64, offset: f64) -> f64 {
    index as f64 * step + offset
}

/// Produces the grid lines around a point for one grid.
pub struct GridProvider<'a> {
    index: usize,
    grid: &'a GridConfig,
}

impl<'a> GridProvider<'a> {
    /// `index` identifies the grid within the layout for caching.
    pub fn new(index: usize, grid: &'a GridConfig) -> Self {
        Self { index, grid }
    }

    /// Line spacing in use. With `zoom`, spacing grows until cells are visible.
    ///
    /// For axonometric grids `x` is the distance between vertical lines and
    /// `y` the vertical distance between slanted lines.
    pub fn effective_spacing(&self, zoom: Option<f64>) -> Vec2 {
        let major = self.grid.major_interval;
        let scale = |length: f64| match zoom {
            Some(zoom) => f64::from(calculate_scaling_factor(length * zoom, major)),
            None => 1.0,
        };
        match self.grid.kind {
            GridKind::Rectangular => {
                let s = self.grid.spacing;
                Vec2::new(s.x * scale(s.x), s.y * scale(s.y))
            }
            GridKind::Axonometric { .. } => {
                let sum = self.grid.axonometric_tangents().map_or(1.0, |(x, z)| x + z);
                let mult = scale(self.grid.spacing.y);
                Vec2::new(self.grid.spacing.y / sum * mult, self.grid.spacing.y * mult)
            }
        }
    }

    fn cell_key(&self, q: Point, spacing: Vec2) -> Option<CellKey> {
        let o = self.grid.origin;
        match self.grid.kind {
            GridKind::Rectangular => Some(CellKey::Rectangular {
                x: bracket(q.x, spacing.x, o.x),
                y: bracket(q.y, spacing.y, o.y),
            }),
            GridKind::Axonometric { .. } => {
                let (ta_x, ta_z) = self.grid.axonometric_tangents()?;
                let x = bracket(q.x, spacing.x, o.x);
                let z = bracket(q.y - ta_z * (q.x - o.x), spacing.y, o.y);
                let xp = bracket(q.y + ta_x * (q.x - o.x), spacing.y, o.y);

                // The upper x and z lines cross on the vertical line that
                // splits the enclosing parallelogram into two triangles.
                let sum = ta_x + ta_z;
                let half = if sum.abs() < EPSILON {
                    Half::Both
                } else {
                    let crossing = (at(xp[1], spacing.y, o.y) - at(z[1], spacing.y, o.y)) / sum;
                    if q.x - o.x < crossing {
                        Half::Left
                    } else {
                        Half::Right
                    }
                };
                Some(CellKey::Axonometric { x, z, xp, half })
            }
        }
    }

    fn lines_for_key(&self, key: CellKey, spacing: Vec2) -> Vec<Line> {
        let o = self.grid.origin;
        let mut lines = Vec::new();
        match key {
            CellKey::Rectangular { x, y } => {
                for i in x {
                    lines.push(Line::vertical(at(i, spacing.x, o.x)));
                }
                for i in y {
                    lines.push(Line::horizontal(at(i, spacing.y, o.y)));
                }
            }
            CellKey::Axonometric { x, z, xp, half } => {
                let Some((ta_x, ta_z)) = self.grid.axonometric_tangents() else {
                    return lines;
                };
                let dir_x = Vec2::new(1.0, -ta_x);
                let dir_z = Vec2::new(1.0, ta_z);
                let z_line = |i| Line::new(Point::new(o.x, at(i, spacing.y, o.y)), dir_z);
                let x_line = |i| Line::new(Point::new(o.x, at(i, spacing.y, o.y)), dir_x);

                if matches!(half, Half::Left | Half::Both) {
                    lines.extend(z_line(z[1]));
                    lines.extend(x_line(xp[0]));
                    lines.push(Line::vertical(at(x[1], spacing.x, o.x)));
                }
                if matches!(half, Half::Right | Half::Both) {
                    lines.extend(z_line(z[0]));
                    lines.extend(x_line(xp[1]));
                    lines.push(Line::vertical(at(x[0], spacing.x, o.x)));
                }
            }
        }

        if self.grid.rotation != 0.0 {
            let back = self.grid.from_grid_frame();
            lines = lines.iter().filter_map(|line| line.transform(back)).collect();
        }
        lines
    }

    /// Lines bracketing `p`, reusing `cache` while `p` stays in the same cell.
    ///
    /// A grid that fails validation yields nothing.
    pub fn lines(&self, p: Point, zoom: Option<f64>, cache: &mut SnapCache) -> Vec<Line> {
        if let Err(err) = self.grid.validate() {
            log::debug!("Skipping grid {}: {}", self.index, err);
            return Vec::new();
        }
        let spacing = self.effective_spacing(zoom);
        let q = if self.grid.rotation != 0.0 {
            self.grid.to_grid_frame() * p
        } else {
            p
        };
        let Some(key) = self.cell_key(q, spacing) else {
            return Vec::new();
        };

        if let Some(cached) = cache.grids.get(&self.index) {
            if cached.key == key && cached.spacing == spacing && cached.config == *self.grid {
                cache.hits += 1;
                return cached.lines.clone();
            }
        }

        cache.misses += 1;
        let lines = self.lines_for_key(key, spacing);
        cache.grids.insert(
            self.index,
            GridBracket {
                config: self.grid.clone(),
                spacing,
                key,
                lines: lines.clone(),
            },
        );
        lines
    }

    /// Grid lines around `p` as candidates.
    pub fn candidates(
        &self,
        p: Point,
        zoom: Option<f64>,
        always_snap: bool,
        cache: &mut SnapCache,
    ) -> impl Iterator<Item = SnapCandidate> + use<> {
        self.lines(p, zoom, cache)
            .into_iter()
            .map(move |line| SnapCandidate::line(line, SnapTarget::Grid, None).always(always_snap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_vertical(lines: &[Line], x: f64) -> bool {
        lines
            .iter()
            .any(|l| l.direction().x.abs() < 1e-9 && (l.origin().x - x).abs() < 1e-9)
    }

    fn has_horizontal(lines: &[Line], y: f64) -> bool {
        lines
            .iter()
            .any(|l| l.direction().y.abs() < 1e-9 && (l.origin().y - y).abs() < 1e-9)
    }

    #[test]
    fn test_rectangular_bracket() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0));
        let provider = GridProvider::new(0, &grid);
        let lines = provider.lines(Point::new(7.8, 2.1), None, &mut SnapCache::new());
        assert_eq!(lines.len(), 4);
        assert!(has_vertical(&lines, 5.0));
        assert!(has_vertical(&lines, 10.0));
        assert!(has_horizontal(&lines, 0.0));
        assert!(has_horizontal(&lines, 5.0));
    }

    #[test]
    fn test_point_on_line_keeps_two_lines() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0));
        let provider = GridProvider::new(0, &grid);
        let lines = provider.lines(Point::new(10.0, 2.1), None, &mut SnapCache::new());
        assert_eq!(lines.len(), 4);
        assert!(has_vertical(&lines, 10.0));
        assert!(has_vertical(&lines, 15.0));
        assert!(has_horizontal(&lines, 0.0));
        assert!(has_horizontal(&lines, 5.0));

        let corner = provider.lines(Point::new(5.0, 5.0), None, &mut SnapCache::new());
        assert_eq!(corner.len(), 4);
        assert!(has_vertical(&corner, 5.0));
        assert!(has_vertical(&corner, 10.0));
        assert!(has_horizontal(&corner, 5.0));
        assert!(has_horizontal(&corner, 10.0));
    }

    #[test]
    fn test_rectangular_with_origin() {
        let grid = GridConfig::rectangular(Point::new(1.0, 2.0), Vec2::new(5.0, 4.0));
        let provider = GridProvider::new(0, &grid);
        let lines = provider.lines(Point::new(7.8, 2.1), None, &mut SnapCache::new());
        assert!(has_vertical(&lines, 6.0));
        assert!(has_vertical(&lines, 11.0));
        assert!(has_horizontal(&lines, 2.0));
        assert!(has_horizontal(&lines, 6.0));
    }

    #[test]
    fn test_rotated_grid_lines_still_bracket() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0)).with_rotation(90.0);
        let provider = GridProvider::new(0, &grid);
        let p = Point::new(7.8, 2.1);
        let lines = provider.lines(p, None, &mut SnapCache::new());
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert!(line.distance(p) <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn test_visible_only_scaling() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(1.0, 1.0));
        let provider = GridProvider::new(0, &grid);
        assert_eq!(provider.effective_spacing(Some(1.0)), Vec2::new(5.0, 5.0));
        assert_eq!(provider.effective_spacing(Some(10.0)), Vec2::new(1.0, 1.0));
        assert_eq!(provider.effective_spacing(None), Vec2::new(1.0, 1.0));

        let lines = provider.lines(Point::new(7.0, 2.0), Some(1.0), &mut SnapCache::new());
        assert!(has_vertical(&lines, 5.0));
        assert!(has_vertical(&lines, 10.0));
    }

    #[test]
    fn test_degenerate_grid_yields_nothing() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(0.0, 5.0));
        let provider = GridProvider::new(0, &grid);
        assert!(provider.lines(Point::new(1.0, 1.0), None, &mut SnapCache::new()).is_empty());
    }

    #[test]
    fn test_cache_reused_within_cell() {
        let grid = GridConfig::rectangular(Point::ZERO, Vec2::new(5.0, 5.0));
        let provider = GridProvider::new(0, &grid);
        let mut cache = SnapCache::new();

        provider.lines(Point::new(7.8, 2.1), None, &mut cache);
        provider.lines(Point::new(8.5, 3.0), None, &mut cache);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);

        provider.lines(Point::new(12.0, 3.0), None, &mut cache);
        assert_eq!(cache.misses(), 2);

        // A changed configuration invalidates the bracket
        let moved = GridConfig::rectangular(Point::new(1.0, 0.0), Vec2::new(5.0, 5.0));
        GridProvider::new(0, &moved).lines(Point::new(12.0, 3.0), None, &mut cache);
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_axonometric_triangle() {
        let grid = GridConfig::axonometric(Point::ZERO, 10.0, 30.0, 30.0);
        let provider = GridProvider::new(0, &grid);
        let p = Point::new(1.0, 1.0);
        let lines = provider.lines(p, None, &mut SnapCache::new());
        assert_eq!(lines.len(), 3);

        // The vertical side sits on a multiple of the horizontal spacing
        let spacing_h = provider.effective_spacing(None).x;
        assert!((spacing_h - 10.0 / (2.0 * 30f64.to_radians().tan())).abs() < 1e-9);
        assert!(has_vertical(&lines, 0.0));

        // Every side is within one cell of the point
        for line in &lines {
            assert!(line.distance(p) < 10.0);
        }
    }

    #[test]
    fn test_axonometric_candidates_are_grid_lines() {
        let grid = GridConfig::axonometric(Point::ZERO, 10.0, 30.0, 30.0);
        let provider = GridProvider::new(0, &grid);
        let candidates: Vec<_> = provider
            .candidates(Point::new(3.0, 4.0), None, true, &mut SnapCache::new())
            .collect();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.target == SnapTarget::Grid && c.always_snap));
    }
}
