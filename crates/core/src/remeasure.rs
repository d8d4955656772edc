//! Keeps the reader's place when item sizes change
//!
//! Zoom and rotation change every item size at once. The reader's relative
//! position in the document is kept: the old offset is mapped onto the new
//! extent proportionally. Dimension refinements change single items; there
//! the first visible item is kept anchored instead.

use log::debug;
use pageview_layout::ViewportWindow;

/// Scroll geometry before and after a remeasure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemeasureOutcome {
    pub old_offset: f32,
    pub old_extent: f32,
    pub new_offset: f32,
    pub new_extent: f32,
}

/// `old_offset / old_extent * new_extent`, or 0 for an empty old extent.
pub fn preserve_relative_offset(old_offset: f32, old_extent: f32, new_extent: f32) -> f32 {
    if !old_extent.is_finite() || old_extent <= 0.0 || !old_offset.is_finite() || !new_extent.is_finite() {
        return 0.0;
    }
    old_offset / old_extent * new_extent
}

/// Remeasure `window` and move the scroll offset proportionally.
pub fn remeasure_proportional<W>(window: &mut W, estimate: &dyn Fn(usize) -> f32) -> RemeasureOutcome
where
    W: ViewportWindow + ?Sized,
{
    let old_offset = window.scroll_offset();
    let old_extent = window.total_extent();

    window.remeasure(estimate);
    let new_extent = window.total_extent();
    let new_offset = preserve_relative_offset(old_offset, old_extent, new_extent);
    window.scroll_to_offset(new_offset);

    debug!("remeasured: offset {old_offset:.1}/{old_extent:.1} -> {new_offset:.1}/{new_extent:.1}");
    RemeasureOutcome { old_offset, old_extent, new_offset, new_extent }
}

/// Remeasure `window`, keeping the first live item at the same place on screen.
pub fn remeasure_anchored<W>(window: &mut W, estimate: &dyn Fn(usize) -> f32) -> RemeasureOutcome
where
    W: ViewportWindow + ?Sized,
{
    let old_offset = window.scroll_offset();
    let old_extent = window.total_extent();
    let anchor = window
        .virtual_items()
        .into_iter()
        .rfind(|item| item.start <= old_offset)
        .map(|item| (item.index, old_offset - item.start));

    window.remeasure(estimate);
    let new_extent = window.total_extent();

    let target = match anchor {
        Some((index, within)) => {
            window.scroll_to_index(index);
            window.scroll_offset() + within
        }
        None => old_offset,
    };
    window.scroll_to_offset(target);

    RemeasureOutcome { old_offset, old_extent, new_offset: window.scroll_offset(), new_extent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageview_layout::{VirtualItem, VirtualWindow};

    /// Records what the coordinator asks of it.
    struct ScriptedWindow {
        offset: f32,
        extent: f32,
        extent_after: f32,
        scrolled_to: Vec<f32>,
    }

    impl ViewportWindow for ScriptedWindow {
        fn count(&self) -> usize {
            10
        }
        fn set_count(&mut self, _count: usize, _estimate: &dyn Fn(usize) -> f32) {}
        fn is_enabled(&self) -> bool {
            true
        }
        fn set_enabled(&mut self, _enabled: bool) {}
        fn virtual_items(&self) -> Vec<VirtualItem> {
            Vec::new()
        }
        fn total_extent(&self) -> f32 {
            self.extent
        }
        fn scroll_offset(&self) -> f32 {
            self.offset
        }
        fn scroll_to_index(&mut self, _index: usize) {}
        fn scroll_to_offset(&mut self, offset: f32) {
            self.scrolled_to.push(offset);
            self.offset = offset;
        }
        fn remeasure(&mut self, _estimate: &dyn Fn(usize) -> f32) {
            self.extent = self.extent_after;
        }
    }

    #[test]
    fn doubling_extent_doubles_offset() {
        let mut window = ScriptedWindow { offset: 500.0, extent: 2000.0, extent_after: 4000.0, scrolled_to: Vec::new() };

        let outcome = remeasure_proportional(&mut window, &|_| 0.0);
        assert_eq!(window.scrolled_to, vec![1000.0]);
        assert_eq!(outcome.new_extent, 4000.0);
        assert_eq!(outcome.new_offset, 1000.0);
    }

    #[test]
    fn empty_extent_maps_to_top() {
        assert_eq!(preserve_relative_offset(300.0, 0.0, 1000.0), 0.0);
        assert_eq!(preserve_relative_offset(250.0, 1000.0, 500.0), 125.0);
    }

    #[test]
    fn anchored_remeasure_keeps_first_visible_item_in_place() {
        let mut window = VirtualWindow::new(300.0, 0);
        window.set_count(10, &|_| 100.0);
        window.scroll_to_offset(550.0);

        // page 1 grows by 50: everything below shifts down
        let outcome = remeasure_anchored(&mut window, &|index| if index == 0 { 150.0 } else { 100.0 });
        assert_eq!(outcome.new_extent, 1050.0);
        assert_eq!(window.scroll_offset(), 600.0);
    }
}
