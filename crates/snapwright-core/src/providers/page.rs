//! Page provider: corners and borders of each page rectangle.

use crate::candidate::{ExclusionSet, SnapCandidate, SnapTarget};
use crate::document::Page;
use crate::geom::{rect_corners, rect_edges};

pub struct PageProvider<'a> {
    pages: &'a [Page],
    exclusions: &'a ExclusionSet,
}

impl<'a> PageProvider<'a> {
    pub fn new(pages: &'a [Page], exclusions: &'a ExclusionSet) -> Self {
        Self { pages, exclusions }
    }

    pub fn candidates(&self) -> impl Iterator<Item = SnapCandidate> + 'a {
        let exclusions = self.exclusions;
        self.pages
            .iter()
            .filter(move |page| !exclusions.contains(page.id))
            .flat_map(|page| {
                let id = Some(page.id);
                let rect = page.rect.abs();
                rect_corners(rect)
                    .into_iter()
                    .map(move |corner| SnapCandidate::point(corner, SnapTarget::PageCorner, id))
                    .chain(
                        rect_edges(rect)
                            .into_iter()
                            .map(move |edge| SnapCandidate::segment(edge, SnapTarget::PageBorder, id)),
                    )
            })
    }
}
