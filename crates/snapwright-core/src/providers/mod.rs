//! Candidate source providers.
//!
//! Each provider walks one kind of snap source and yields [`SnapCandidate`]s
//! for a single query. Candidates are never kept across queries; only the
//! grid bracketing in [`SnapCache`] survives while a drag session lasts.
//!
//! [`SnapCandidate`]: crate::candidate::SnapCandidate

mod grid;
mod guide;
mod object;
mod page;

pub use grid::{GridBracket, GridProvider};
pub use guide::GuideProvider;
pub use object::{IntersectionScope, ObjectProvider, MAX_SNAP_OBJECTS};
pub use page::PageProvider;

use std::collections::HashMap;

/// Per-session cache of grid lines bracketing the dragged point.
#[derive(Debug, Default)]
pub struct SnapCache {
    grids: HashMap<usize, GridBracket>,
    hits: usize,
    misses: usize,
}

impl SnapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached bracket.
    pub fn clear(&mut self) {
        self.grids.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Lookups that had to rebuild the bracket.
    pub fn misses(&self) -> usize {
        self.misses
    }
}
