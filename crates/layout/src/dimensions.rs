//! Per-page intrinsic sizes.
//!
//! The store is keyed by 1-based page number and holds the *un-rotated* size
//! of each page in document units. Pages that have never been measured report
//! the store's default size. Every write replaces the whole map so that a
//! reader holding a [`DimensionStore::snapshot`] never sees a half-applied
//! update.

use crate::rotation::Rotation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Un-rotated intrinsic size of a page in document units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both sides are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Size as seen on screen after applying `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            Self { width: self.height, height: self.width }
        } else {
            self
        }
    }

    pub fn scaled(self, scale: f32) -> Self {
        Self { width: self.width * scale, height: self.height * scale }
    }
}

/// Outcome of recording a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionUpdate {
    /// First size recorded for this page.
    Established,
    /// An existing size was replaced with a different one.
    Refined,
    /// The recorded size was already identical.
    Unchanged,
    /// The size was not finite/positive and was ignored.
    Rejected,
}

impl DimensionUpdate {
    /// Whether item sizes derived from the store may have changed.
    pub fn changes_layout(self) -> bool {
        matches!(self, DimensionUpdate::Established | DimensionUpdate::Refined)
    }
}

/// Page dimension map plus the fallback size for unmeasured pages.
#[derive(Debug, Clone)]
pub struct DimensionStore {
    pages: Arc<HashMap<u32, PageDimensions>>,
    default_size: PageDimensions,
}

impl DimensionStore {
    pub fn new(default_size: PageDimensions) -> Self {
        Self { pages: Arc::new(HashMap::new()), default_size }
    }

    pub fn default_size(&self) -> PageDimensions {
        self.default_size
    }

    /// Replace the fallback size. Invalid sizes are ignored.
    pub fn set_default_size(&mut self, size: PageDimensions) -> bool {
        if !size.is_valid() || size == self.default_size {
            return false;
        }
        self.default_size = size;
        true
    }

    /// Recorded size for `page`, if it has ever been measured.
    pub fn get(&self, page: u32) -> Option<PageDimensions> {
        self.pages.get(&page).copied()
    }

    /// Recorded size for `page`, or the default size.
    pub fn effective(&self, page: u32) -> PageDimensions {
        self.get(page).unwrap_or(self.default_size)
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Record the size of `page`. The first write establishes it, later writes refine it.
    pub fn record(&mut self, page: u32, size: PageDimensions) -> DimensionUpdate {
        if page == 0 || !size.is_valid() {
            return DimensionUpdate::Rejected;
        }

        let update = match self.pages.get(&page) {
            Some(existing) if *existing == size => return DimensionUpdate::Unchanged,
            Some(_) => DimensionUpdate::Refined,
            None => DimensionUpdate::Established,
        };

        let mut next = HashMap::clone(&self.pages);
        next.insert(page, size);
        self.pages = Arc::new(next);
        update
    }

    /// Record several sizes in a single map replacement.
    pub fn record_many(&mut self, sizes: impl IntoIterator<Item = (u32, PageDimensions)>) -> usize {
        let mut next = HashMap::clone(&self.pages);
        let mut changed = 0;
        for (page, size) in sizes {
            if page == 0 || !size.is_valid() {
                continue;
            }
            if next.insert(page, size) != Some(size) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.pages = Arc::new(next);
        }
        changed
    }

    /// Cheap handle on the current map. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<HashMap<u32, PageDimensions>> {
        Arc::clone(&self.pages)
    }
}

impl Default for DimensionStore {
    fn default() -> Self {
        Self::new(PageDimensions::new(500.0, 1000.0))
    }
}
