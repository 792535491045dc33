//! View state needed by snapping: zoom and visible area.
//!
//! Tolerances are configured in screen pixels and converted to document
//! units through the current zoom, so snapping feels the same at any
//! magnification.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom used for pixel to document conversions.
pub const MIN_ZOOM: f64 = 1e-6;

/// Screen size assumed when the caller does not provide one.
pub const DEFAULT_SCREEN_SIZE: Size = Size::new(1280.0, 800.0);

/// Pan/zoom state of the view a drag happens in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapView {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Screen pixels per document unit
    pub zoom: f64,
    /// Size of the drawing area in screen pixels
    pub screen: Size,
}

impl Default for SnapView {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            screen: DEFAULT_SCREEN_SIZE,
        }
    }
}

impl SnapView {
    /// Create a view at 100% with no pan.
    pub fn new() -> Self {
        Self::default()
    }

    /// View with `zoom` whose screen centre shows `center`.
    pub fn centered_on(center: Point, zoom: f64, screen: Size) -> Self {
        let zoom = zoom.max(MIN_ZOOM);
        Self {
            offset: Vec2::new(
                screen.width / 2.0 - center.x * zoom,
                screen.height / 2.0 - center.y * zoom,
            ),
            zoom,
            screen,
        }
    }

    /// Document to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to document transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom.max(MIN_ZOOM)) * Affine::translate(-self.offset)
    }

    pub fn screen_to_document(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn document_to_screen(&self, document_point: Point) -> Point {
        self.transform() * document_point
    }

    /// Visible area in document coordinates.
    pub fn visible_area(&self) -> Rect {
        let inverse = self.inverse_transform();
        let a = inverse * Point::ZERO;
        let b = inverse * Point::new(self.screen.width, self.screen.height);
        Rect::from_points(a, b)
    }

    /// Convert a screen distance in pixels into document units.
    pub fn to_document_length(&self, pixels: f64) -> f64 {
        pixels / self.zoom.max(MIN_ZOOM)
    }
}
