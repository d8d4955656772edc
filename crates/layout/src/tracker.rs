//! Derives the current page from the scroll offset.

use crate::window::VirtualItem;
use pageview_scheduler::Throttle;
use std::time::{Duration, Instant};

/// Minimum time between two scroll-driven evaluations.
pub const DEFAULT_TRACKER_INTERVAL: Duration = Duration::from_millis(100);

/// Page (1-based) of the item whose start offset is closest to `scroll_offset`.
///
/// Ties go to the earlier item.
pub fn nearest_page(items: &[VirtualItem], scroll_offset: f32) -> Option<u32> {
    items
        .iter()
        .min_by(|a, b| {
            let da = (a.start - scroll_offset).abs();
            let db = (b.start - scroll_offset).abs();
            da.total_cmp(&db).then(a.index.cmp(&b.index))
        })
        .map(VirtualItem::page)
}

/// Rate-limited current-page tracker.
#[derive(Debug, Clone)]
pub struct CurrentPageTracker {
    current_page: u32,
    throttle: Throttle,
}

impl CurrentPageTracker {
    pub fn new(interval: Duration) -> Self {
        Self { current_page: 1, throttle: Throttle::new(interval) }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Scroll-driven evaluation. Skipped if the previous one ran less than the
    /// interval ago. Returns the new page when it changed.
    pub fn on_scroll(&mut self, now: Instant, items: &[VirtualItem], scroll_offset: f32) -> Option<u32> {
        if !self.throttle.try_acquire(now) {
            return None;
        }
        self.apply(items, scroll_offset)
    }

    /// Evaluate immediately, bypassing the rate limit. Used after document
    /// load and after an explicit jump.
    pub fn force(&mut self, now: Instant, items: &[VirtualItem], scroll_offset: f32) -> Option<u32> {
        self.throttle.mark(now);
        self.apply(items, scroll_offset)
    }

    /// Set the page directly, e.g. when the page count shrinks.
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    fn apply(&mut self, items: &[VirtualItem], scroll_offset: f32) -> Option<u32> {
        let page = nearest_page(items, scroll_offset)?;
        if page == self.current_page {
            return None;
        }
        self.current_page = page;
        Some(page)
    }
}

impl Default for CurrentPageTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKER_INTERVAL)
    }
}
