//! Grid snappers, one per configured grid.

use crate::candidate::{SnapTarget, ToolContext};
use crate::geom::{Constraint, Coord};
use crate::grid::GridConfig;
use crate::preferences::{SnapOption, SnapPreferences};
use crate::providers::{GridProvider, SnapCache};
use crate::results::IntermSnapResults;

use super::{LineStrategy, Matcher, DragPoint, SnapContext, SnapStrategy, Snapper};

fn grid_interested(grid: &GridConfig, prefs: &SnapPreferences, tool: ToolContext) -> bool {
    tool != ToolContext::Navigation && grid.enabled && prefs.is_enabled() && prefs.bool(SnapOption::GridEnabled)
}

fn grid_tolerance(ctx: &SnapContext<'_>) -> Coord {
    ctx.tolerance(SnapOption::GridTolerance)
}

fn grid_always_snap(ctx: &SnapContext<'_>) -> bool {
    ctx.is_always_snap(SnapOption::GridAlwaysSnap, SnapOption::GridTolerance)
}

/// Grid lines around the dragged point, matched with the line strategy.
fn snap_to_grid(
    index: usize,
    grid: &GridConfig,
    isr: &mut IntermSnapResults,
    dragged: &DragPoint,
    constraint: Option<&Constraint>,
    ctx: &SnapContext<'_>,
    cache: &mut SnapCache,
) {
    let prefs = ctx.preferences;
    let always_snap = grid_always_snap(ctx);
    let zoom = prefs.bool(SnapOption::GridVisibleOnly).then_some(ctx.view.zoom);
    let candidates = GridProvider::new(index, grid).candidates(dragged.point.point, zoom, always_snap, cache);

    let perpendicular = prefs
        .is_target_snappable(SnapTarget::GridPerpendicular)
        .then_some(SnapTarget::GridPerpendicular);
    let matcher = Matcher::new(dragged, grid_tolerance(ctx), always_snap, constraint);
    LineStrategy::new(perpendicular).snap_all(isr, candidates, &matcher);
}

macro_rules! grid_snapper {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            index: usize,
            grid: GridConfig,
        }

        impl $name {
            /// `index` is the grid's position in the layout.
            pub fn new(index: usize, grid: GridConfig) -> Self {
                Self { index, grid }
            }

            pub fn index(&self) -> usize {
                self.index
            }

            pub fn config(&self) -> &GridConfig {
                &self.grid
            }
        }

        impl Snapper for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn is_interested(&self, prefs: &SnapPreferences, tool: ToolContext) -> bool {
                grid_interested(&self.grid, prefs, tool)
            }

            fn tolerance(&self, ctx: &SnapContext<'_>) -> Coord {
                grid_tolerance(ctx)
            }

            fn always_snap(&self, ctx: &SnapContext<'_>) -> bool {
                grid_always_snap(ctx)
            }

            fn free_snap(&self, isr: &mut IntermSnapResults, dragged: &DragPoint, ctx: &SnapContext<'_>, cache: &mut SnapCache) {
                snap_to_grid(self.index, &self.grid, isr, dragged, None, ctx, cache);
            }

            fn constrained_snap(
                &self,
                isr: &mut IntermSnapResults,
                dragged: &DragPoint,
                constraint: &Constraint,
                ctx: &SnapContext<'_>,
                cache: &mut SnapCache,
            ) {
                let dragged = dragged.projected(constraint);
                snap_to_grid(self.index, &self.grid, isr, &dragged, Some(constraint), ctx, cache);
            }
        }
    };
}

grid_snapper!(
    /// Snaps to a rectangular grid.
    GridSnapper,
    "grid"
);

grid_snapper!(
    /// Snaps to an axonometric grid (three axis directions).
    AxonometricGridSnapper,
    "axonometric grid"
);
