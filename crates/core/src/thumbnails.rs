//! Thumbnail strip
//!
//! A second window over the same pages at a fixed small scale. Layout ignores
//! rotation, so thumbnails never move when the main view turns; the rendered
//! images still follow rotation and are re-rendered when it changes.

use crate::config::ViewerConfig;
use crate::lifecycle::{Completion, PageLifecycle, RenderTarget};
use crate::paint::{thumbnail_face, PagePaint};
use log::debug;
use pageview_cache::{SnapshotError, SnapshotImage, ThumbnailCache};
use pageview_engine::RgbaImage;
use pageview_layout::{DimensionStore, Rotation, ThumbnailEstimator, ViewportWindow, VirtualWindow};
use pageview_scheduler::Ticket;
use std::collections::BTreeSet;
use std::time::Instant;

/// Sidebar visibility and width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidebarState {
    open: bool,
    width: f32,
    min_width: f32,
    max_width: f32,
}

impl SidebarState {
    pub fn new(width: f32, min_width: f32, max_width: f32) -> Self {
        Self { open: true, width: width.clamp(min_width, max_width), min_width, max_width }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Flip open/closed. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    /// Apply a drag of `delta` pixels. Returns the clamped width.
    pub fn resize_by(&mut self, delta: f32) -> f32 {
        if delta.is_finite() {
            self.width = (self.width + delta).clamp(self.min_width, self.max_width);
        }
        self.width
    }
}

/// Window, lifecycle and cache of the thumbnail strip
#[derive(Debug)]
pub struct ThumbnailWindow {
    window: VirtualWindow,
    estimator: ThumbnailEstimator,
    pages: PageLifecycle,
    cache: ThumbnailCache,
    quality: u8,
}

impl ThumbnailWindow {
    pub fn new(config: &ViewerConfig) -> Self {
        let mut window = VirtualWindow::new(0.0, config.overscan);
        window.set_enabled(false);
        Self {
            window,
            estimator: ThumbnailEstimator::new(config.thumbnail_scale, config.thumbnail_margin),
            pages: PageLifecycle::new(),
            cache: ThumbnailCache::new(),
            quality: config.snapshot_quality,
        }
    }

    pub fn scale(&self) -> f32 {
        self.estimator.scale()
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub fn lifecycle(&self) -> &PageLifecycle {
        &self.pages
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.window.set_enabled(enabled);
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.window.set_viewport_size(height);
    }

    pub fn set_count(&mut self, count: u32, dims: &DimensionStore) {
        let estimator = self.estimator;
        self.window.set_count(count as usize, &|index| estimator.estimate(index, dims));
        self.cache.set_page_count(count);
    }

    /// Re-measure after page sizes changed.
    pub fn remeasure(&mut self, dims: &DimensionStore) {
        let estimator = self.estimator;
        crate::remeasure::remeasure_anchored(&mut self.window, &|index| estimator.estimate(index, dims));
    }

    pub fn scroll_to_offset(&mut self, offset: f32) {
        self.window.scroll_to_offset(offset);
    }

    /// Scroll just enough to bring `page` into view.
    pub fn reveal(&mut self, page: u32) {
        let index = page.saturating_sub(1) as usize;
        let visible = self.window.visible_range();
        let shown = visible.is_some_and(|(first, last)| {
            // the first and last items may only be partly visible
            index > first && index < last
        });
        if !shown {
            self.window.scroll_to_index(index);
        }
    }

    /// Rotation changed: every live thumbnail is out of date.
    pub fn mark_rotated(&mut self) {
        let live: Vec<u32> = self.window.virtual_items().iter().map(|item| item.page()).collect();
        self.pages.mark_stale(&live);
    }

    /// Release thumbnails that left the window and issue renders for the
    /// ones that need one.
    pub fn sync(&mut self, rotation: Rotation, dims: &DimensionStore) -> Vec<(u32, RenderTarget, Ticket)> {
        let items = self.window.virtual_items();
        let live: BTreeSet<u32> = items.iter().map(|item| item.page()).collect();
        self.pages.retain_window(&live, |page| dims.contains(page));

        let target = RenderTarget::new(self.estimator.scale(), rotation);
        let mut issued = Vec::new();
        for page in live {
            if self.pages.needs_render(page, target) {
                issued.push((page, target, self.pages.begin(page, target)));
            }
        }
        issued
    }

    /// Apply a finished thumbnail render and cache it. A thumbnail that
    /// cannot be encoded is still shown live, just not cached.
    pub fn complete(
        &mut self,
        page: u32,
        generation: u64,
        surface: RgbaImage,
        target: RenderTarget,
        now: Instant,
    ) -> (Completion, Option<SnapshotError>) {
        if !self.pages.is_current(page, generation) {
            return (self.pages.complete(page, generation, surface, target), None);
        }

        let encoded = SnapshotImage::encode(&surface, self.quality);
        let completion = self.pages.complete(page, generation, surface, target);
        match encoded {
            Ok(image) => {
                self.cache.put(page, image, target.rotation, now);
                (completion, None)
            }
            Err(err) => (completion, Some(err)),
        }
    }

    pub fn fail(&mut self, page: u32, generation: u64) -> bool {
        self.pages.fail(page, generation)
    }

    pub fn paint_plan(&self, rotation: Rotation, dims: &DimensionStore, current_page: u32) -> Vec<PagePaint> {
        self.window
            .virtual_items()
            .into_iter()
            .map(|item| {
                let page = item.page();
                let state = self.pages.state(page);
                PagePaint {
                    page,
                    top: item.start,
                    height: item.size,
                    page_box: dims.effective(page).scaled(self.estimator.scale()),
                    state,
                    current: page == current_page,
                    face: thumbnail_face(state, self.pages.surface(page), self.cache.get(page), rotation),
                }
            })
            .collect()
    }

    /// Drop everything: renders, surfaces and cached thumbnails.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.cache.clear();
        self.window.set_count(0, &|_| 0.0);
        self.window.set_enabled(false);
        debug!("thumbnail strip cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::PageState;
    use image::Rgba;
    use pageview_layout::PageDimensions;

    fn strip(count: u32) -> (ThumbnailWindow, DimensionStore) {
        let config = ViewerConfig::default();
        let dims = DimensionStore::new(PageDimensions::new(500.0, 1000.0));
        let mut strip = ThumbnailWindow::new(&config);
        strip.set_viewport_height(400.0);
        strip.set_count(count, &dims);
        strip.set_enabled(true);
        (strip, dims)
    }

    #[test]
    fn sidebar_resize_is_clamped() {
        let mut sidebar = SidebarState::new(220.0, 120.0, 480.0);
        assert_eq!(sidebar.resize_by(500.0), 480.0);
        assert_eq!(sidebar.resize_by(-1000.0), 120.0);
        assert_eq!(sidebar.resize_by(f32::NAN), 120.0);
        assert!(!sidebar.toggle());
        assert!(sidebar.toggle());
    }

    #[test]
    fn layout_uses_fixed_scale_and_ignores_rotation() {
        let (strip, _) = strip(20);
        // 1000 * 0.16 + 10
        assert_eq!(strip.window().item(1).map(|item| item.start), Some(170.0));
    }

    #[test]
    fn rendered_thumbnail_is_cached_and_goes_stale_on_rotation() {
        let (mut strip, dims) = strip(20);
        let issued = strip.sync(Rotation::Deg0, &dims);
        assert!(!issued.is_empty());
        assert!(issued.iter().all(|(_, target, _)| target.scale == 0.16));

        let (page, target, ticket) = issued[0].clone();
        let surface = RgbaImage::from_pixel(80, 160, Rgba([9, 9, 9, 255]));
        let (outcome, error) = strip.complete(page, ticket.generation, surface, target, Instant::now());
        assert_eq!(outcome, Completion::Applied);
        assert!(error.is_none());
        assert!(strip.cache().is_fresh(page, Rotation::Deg0));

        strip.mark_rotated();
        assert_eq!(strip.lifecycle().state(page), PageState::Rendering);
        let plan = strip.paint_plan(Rotation::Deg90, &dims, page);
        let painted = plan.iter().find(|p| p.page == page).unwrap();
        assert!(painted.current);
        assert!(painted.face.is_snapshot());
        assert_eq!(painted.face.transform().map(|t| t.rotate), Some(Rotation::Deg90));
    }

    #[test]
    fn reveal_scrolls_current_page_into_view() {
        let (mut strip, _) = strip(40);
        strip.reveal(30);
        let (first, last) = strip.window().visible_range().unwrap();
        assert!((first..=last).contains(&29));

        let offset = strip.window().scroll_offset();
        strip.reveal(31);
        assert_eq!(strip.window().scroll_offset(), offset);
    }
}
