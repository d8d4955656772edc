//! Windowed (virtualized) list of variable-height items.
//!
//! Item sizes come from an estimator closure and are kept as prefix sums, so
//! offset lookups are binary searches. Only the items intersecting the
//! viewport, plus `overscan` items on each side, are reported as live.

use log::debug;

/// Number of extra items materialized before and after the visible range.
pub const DEFAULT_OVERSCAN: usize = 2;

/// One materialized item: 0-based index, absolute start offset and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f32,
    pub size: f32,
}

impl VirtualItem {
    pub fn end(&self) -> f32 {
        self.start + self.size
    }

    /// 1-based page number of this item.
    pub fn page(&self) -> u32 {
        self.index as u32 + 1
    }
}

/// Windowing contract consumed by the viewer.
pub trait ViewportWindow {
    fn count(&self) -> usize;

    /// Change the item count and measure every item.
    fn set_count(&mut self, count: usize, estimate: &dyn Fn(usize) -> f32);

    fn is_enabled(&self) -> bool;

    /// A disabled window reports no items.
    fn set_enabled(&mut self, enabled: bool);

    /// Visible items plus overscan, in index order.
    fn virtual_items(&self) -> Vec<VirtualItem>;

    fn total_extent(&self) -> f32;

    fn scroll_offset(&self) -> f32;

    fn scroll_to_index(&mut self, index: usize);

    fn scroll_to_offset(&mut self, offset: f32);

    /// Recompute every item size with `estimate`, keeping the scroll offset.
    fn remeasure(&mut self, estimate: &dyn Fn(usize) -> f32);
}

/// Prefix-sum backed implementation of [`ViewportWindow`].
#[derive(Debug, Clone)]
pub struct VirtualWindow {
    sizes: Vec<f32>,
    starts: Vec<f32>,
    total: f32,
    scroll_offset: f32,
    viewport_size: f32,
    overscan: usize,
    enabled: bool,
}

impl VirtualWindow {
    pub fn new(viewport_size: f32, overscan: usize) -> Self {
        Self {
            sizes: Vec::new(),
            starts: Vec::new(),
            total: 0.0,
            scroll_offset: 0.0,
            viewport_size: sanitize(viewport_size),
            overscan,
            enabled: true,
        }
    }

    pub fn viewport_size(&self) -> f32 {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: f32) {
        self.viewport_size = sanitize(size);
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Largest offset that still fills the viewport.
    pub fn max_scroll_offset(&self) -> f32 {
        (self.total - self.viewport_size).max(0.0)
    }

    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        Some(VirtualItem { index, start: *self.starts.get(index)?, size: *self.sizes.get(index)? })
    }

    /// Items intersecting the viewport, without overscan.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        if !self.enabled || self.sizes.is_empty() {
            return None;
        }

        let offset = self.scroll_offset;
        let first = self.starts.partition_point(|start| *start <= offset).saturating_sub(1);
        let viewport_end = offset + self.viewport_size;
        let last = self
            .starts
            .partition_point(|start| *start < viewport_end)
            .saturating_sub(1)
            .max(first);

        Some((first, last.min(self.sizes.len() - 1)))
    }

    fn measure_all(&mut self, estimate: &dyn Fn(usize) -> f32) {
        let count = self.sizes.len();
        self.starts.clear();
        let mut cursor = 0.0_f32;
        for index in 0..count {
            let size = sanitize(estimate(index)).max(1.0);
            self.sizes[index] = size;
            self.starts.push(cursor);
            cursor += size;
        }
        self.total = cursor;
    }
}

impl ViewportWindow for VirtualWindow {
    fn count(&self) -> usize {
        self.sizes.len()
    }

    fn set_count(&mut self, count: usize, estimate: &dyn Fn(usize) -> f32) {
        self.sizes = vec![0.0; count];
        self.measure_all(estimate);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
        debug!("window count set to {count}, extent {:.1}", self.total);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn virtual_items(&self) -> Vec<VirtualItem> {
        let Some((first, last)) = self.visible_range() else {
            return Vec::new();
        };

        let start = first.saturating_sub(self.overscan);
        let end = (last + self.overscan).min(self.sizes.len() - 1);
        (start..=end).filter_map(|index| self.item(index)).collect()
    }

    fn total_extent(&self) -> f32 {
        self.total
    }

    fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    fn scroll_to_index(&mut self, index: usize) {
        if self.starts.is_empty() {
            return;
        }
        let index = index.min(self.starts.len() - 1);
        let target = self.starts[index];
        self.scroll_to_offset(target);
    }

    fn scroll_to_offset(&mut self, offset: f32) {
        self.scroll_offset = sanitize(offset).min(self.max_scroll_offset());
    }

    fn remeasure(&mut self, estimate: &dyn Fn(usize) -> f32) {
        self.measure_all(estimate);
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(count: usize, size: f32, viewport: f32) -> VirtualWindow {
        let mut window = VirtualWindow::new(viewport, DEFAULT_OVERSCAN);
        window.set_count(count, &|_| size);
        window
    }

    #[test]
    fn extent_is_sum_of_sizes() {
        let window = uniform(10, 100.0, 250.0);
        assert_eq!(window.total_extent(), 1000.0);
        assert_eq!(window.item(3), Some(VirtualItem { index: 3, start: 300.0, size: 100.0 }));
    }

    #[test]
    fn items_cover_viewport_plus_overscan() {
        let mut window = uniform(10, 100.0, 250.0);
        window.scroll_to_offset(450.0);

        let indexes: Vec<usize> = window.virtual_items().iter().map(|item| item.index).collect();
        // visible 4..=6, overscan 2 each side
        assert_eq!(indexes, vec![2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn overscan_is_clamped_at_edges() {
        let window = uniform(3, 100.0, 50.0);
        let indexes: Vec<usize> = window.virtual_items().iter().map(|item| item.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn disabled_window_emits_nothing() {
        let mut window = uniform(10, 100.0, 250.0);
        window.set_enabled(false);
        assert!(window.virtual_items().is_empty());
        window.set_enabled(true);
        assert!(!window.virtual_items().is_empty());
    }

    #[test]
    fn scroll_to_index_aligns_item_start_and_clamps() {
        let mut window = uniform(10, 100.0, 250.0);
        window.scroll_to_index(4);
        assert_eq!(window.scroll_offset(), 400.0);

        window.scroll_to_index(99);
        assert_eq!(window.scroll_offset(), 750.0);

        window.scroll_to_offset(-20.0);
        assert_eq!(window.scroll_offset(), 0.0);
    }

    #[test]
    fn remeasure_keeps_scroll_offset() {
        let mut window = uniform(10, 100.0, 250.0);
        window.scroll_to_offset(500.0);
        window.remeasure(&|_| 200.0);
        assert_eq!(window.total_extent(), 2000.0);
        assert_eq!(window.scroll_offset(), 500.0);
        assert_eq!(window.item(9).map(|item| item.start), Some(1800.0));
    }

    #[test]
    fn non_finite_estimates_are_floored() {
        let mut window = VirtualWindow::new(100.0, 0);
        window.set_count(2, &|index| if index == 0 { f32::NAN } else { 50.0 });
        assert_eq!(window.total_extent(), 51.0);
    }

    #[test]
    fn empty_window_is_inert() {
        let mut window = VirtualWindow::new(100.0, 2);
        window.scroll_to_index(3);
        assert_eq!(window.scroll_offset(), 0.0);
        assert!(window.virtual_items().is_empty());
        assert_eq!(window.visible_range(), None);
    }
}
