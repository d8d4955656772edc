//! Expected on-screen footprint of a page.
//!
//! These functions are pure so the viewport window can call them repeatedly
//! while scrolling. The fixed margin sits outside the scaled term: zooming
//! never grows the gap between pages.

use crate::dimensions::{DimensionStore, PageDimensions};
use crate::rotation::Rotation;

/// Gap added below every page in the main view.
pub const DEFAULT_PAGE_MARGIN: f32 = 20.0;

/// Smallest size ever reported, so a window never sees a zero-height item.
const MIN_ITEM_SIZE: f32 = 1.0;

/// Height estimator for the main page column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeEstimator {
    margin: f32,
}

impl SizeEstimator {
    pub fn new(margin: f32) -> Self {
        let margin = if margin.is_finite() && margin >= 0.0 { margin } else { DEFAULT_PAGE_MARGIN };
        Self { margin }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Height of the item at 0-based `page_index` at the given zoom and rotation.
    pub fn estimate(
        &self,
        page_index: usize,
        zoom: f32,
        rotation: Rotation,
        dims: &DimensionStore,
    ) -> f32 {
        let page = page_index as u32 + 1;
        let size = dims.effective(page).rotated(rotation);
        let estimate = size.height * zoom + self.margin;
        if estimate.is_finite() && estimate > 0.0 {
            return estimate;
        }

        // Degrade to the default size, then to the bare margin.
        let fallback = dims.default_size().rotated(rotation).height * zoom + self.margin;
        if fallback.is_finite() && fallback > 0.0 {
            fallback
        } else {
            self.margin.max(MIN_ITEM_SIZE)
        }
    }

    /// On-screen page box (without margin) for painting.
    pub fn page_box(
        &self,
        page: u32,
        zoom: f32,
        rotation: Rotation,
        dims: &DimensionStore,
    ) -> PageDimensions {
        dims.effective(page).rotated(rotation).scaled(zoom)
    }
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_MARGIN)
    }
}

/// Height estimator for the thumbnail strip.
///
/// The strip scale is fixed and rotation is ignored for layout, so thumbnail
/// offsets never move when the main view rotates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailEstimator {
    scale: f32,
    margin: f32,
}

impl ThumbnailEstimator {
    pub fn new(scale: f32, margin: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 0.16 };
        let margin = if margin.is_finite() && margin >= 0.0 { margin } else { 0.0 };
        Self { scale, margin }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn estimate(&self, page_index: usize, dims: &DimensionStore) -> f32 {
        let height = dims.effective(page_index as u32 + 1).height * self.scale + self.margin;
        if height.is_finite() && height > 0.0 {
            height
        } else {
            (dims.default_size().height * self.scale + self.margin).max(MIN_ITEM_SIZE)
        }
    }
}
