//! Thumbnail cache
//!
//! The thumbnail strip renders at one fixed scale, so each page has at most
//! one entry. The entry remembers the rotation it was rendered at so the
//! strip can tell when it is out of date.

use crate::snapshot::SnapshotImage;
use log::debug;
use pageview_layout::Rotation;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ThumbnailEntry {
    pub image: SnapshotImage,
    pub rotation: Rotation,
    pub captured_at: Instant,
}

/// One cached thumbnail per page, copy-on-write like the main store.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCache {
    entries: Arc<HashMap<u32, ThumbnailEntry>>,
    page_count: u32,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
        if self.entries.keys().any(|&page| page > page_count) {
            let next = self
                .entries
                .iter()
                .filter(|(&page, _)| page <= page_count)
                .map(|(&page, entry)| (page, entry.clone()))
                .collect();
            self.entries = Arc::new(next);
        }
    }

    /// Store the thumbnail for `page`, replacing any previous one.
    /// Returns `false` for pages outside `1..=page_count`.
    pub fn put(&mut self, page: u32, image: SnapshotImage, rotation: Rotation, captured_at: Instant) -> bool {
        if page == 0 || page > self.page_count {
            return false;
        }
        let mut next = HashMap::clone(&self.entries);
        next.insert(page, ThumbnailEntry { image, rotation, captured_at });
        self.entries = Arc::new(next);
        debug!("thumbnail for page {page} cached at {rotation}");
        true
    }

    pub fn get(&self, page: u32) -> Option<&ThumbnailEntry> {
        self.entries.get(&page)
    }

    /// Whether `page` has a thumbnail rendered at `rotation`.
    pub fn is_fresh(&self, page: u32, rotation: Rotation) -> bool {
        self.get(page).is_some_and(|entry| entry.rotation == rotation)
    }

    pub fn remove(&mut self, page: u32) -> Option<ThumbnailEntry> {
        if !self.entries.contains_key(&page) {
            return None;
        }
        let mut next = HashMap::clone(&self.entries);
        let removed = next.remove(&page);
        self.entries = Arc::new(next);
        removed
    }

    pub fn clear(&mut self) {
        self.entries = Arc::new(HashMap::new());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoded bytes held across all entries.
    pub fn bytes_used(&self) -> usize {
        self.entries.values().map(|entry| entry.image.byte_len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn image() -> SnapshotImage {
        SnapshotImage::encode(&RgbaImage::from_pixel(4, 6, Rgba([10, 10, 10, 255])), 80).unwrap()
    }

    #[test]
    fn keeps_a_single_entry_per_page() {
        let mut cache = ThumbnailCache::new();
        cache.set_page_count(3);
        let t0 = Instant::now();

        assert!(cache.put(2, image(), Rotation::Deg0, t0));
        assert!(cache.put(2, image(), Rotation::Deg90, t0));
        assert_eq!(cache.len(), 1);
        assert!(cache.is_fresh(2, Rotation::Deg90));
        assert!(!cache.is_fresh(2, Rotation::Deg0));
        assert!(!cache.put(4, image(), Rotation::Deg0, t0));
    }

    #[test]
    fn shrinking_page_count_drops_entries() {
        let mut cache = ThumbnailCache::new();
        cache.set_page_count(5);
        let t0 = Instant::now();
        cache.put(1, image(), Rotation::Deg0, t0);
        cache.put(5, image(), Rotation::Deg0, t0);

        cache.set_page_count(2);
        assert!(cache.get(5).is_none());
        assert!(cache.get(1).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes_used(), 0);
    }
}
