//! Guide provider: every guide line plus its origin handle.

use crate::candidate::{ExclusionSet, SnapCandidate, SnapTarget};
use crate::document::Guide;

/// Yields guide lines and guide origins. Guides are few, so there is no
/// spatial filtering.
pub struct GuideProvider<'a> {
    guides: &'a [Guide],
    exclusions: &'a ExclusionSet,
}

impl<'a> GuideProvider<'a> {
    pub fn new(guides: &'a [Guide], exclusions: &'a ExclusionSet) -> Self {
        Self { guides, exclusions }
    }

    pub fn candidates(&self, always_snap: bool) -> impl Iterator<Item = SnapCandidate> + 'a {
        let exclusions = self.exclusions;
        self.guides
            .iter()
            .filter(move |guide| !exclusions.contains(guide.id))
            .flat_map(move |guide| {
                [
                    SnapCandidate::line(guide.line, SnapTarget::Guide, Some(guide.id)).always(always_snap),
                    SnapCandidate::point(guide.origin(), SnapTarget::GuideOrigin, Some(guide.id)).always(always_snap),
                ]
            })
    }
}
