//! Per-page snapshot store with best-match lookup
//!
//! Each page keeps a short list of snapshots, one per distinct render scale.
//! While a page re-renders, [`RenderCacheStore::best_match`] picks the
//! snapshot that needs the least compensation to stand in for the new render.
//!
//! The page map is copy-on-write: every mutation builds a new map and swaps
//! it in, so a [`RenderCacheStore::snapshot`] handle taken earlier never sees
//! a half-applied update.

use crate::snapshot::{CachedSnapshot, SnapshotImage};
use crate::stats::CacheStats;
use log::debug;
use pageview_layout::Rotation;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Default number of snapshots retained per page.
pub const DEFAULT_MAX_SNAPSHOTS_PER_PAGE: usize = 2;

/// Page number to the snapshots captured for it, oldest first.
pub type SnapshotMap = HashMap<u32, Vec<CachedSnapshot>>;

/// What [`RenderCacheStore::capture`] did with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Appended as a new scale for the page
    Stored,
    /// Appended, and this many older snapshots were evicted to stay under the cap
    StoredWithEviction(usize),
    /// Same scale already held at a different rotation; that entry was replaced
    Replaced,
    /// Same scale and rotation already held; nothing changed
    Duplicate,
    /// Page number outside `1..=page_count`
    OutOfRange,
    /// Scale was not a positive finite number
    InvalidScale,
}

impl CaptureOutcome {
    pub fn was_stored(self) -> bool {
        matches!(
            self,
            CaptureOutcome::Stored | CaptureOutcome::StoredWithEviction(_) | CaptureOutcome::Replaced
        )
    }
}

/// Scales are compared at a resolution of 1/1000.
fn scale_key(scale: f32) -> i64 {
    (f64::from(scale) * 1000.0).round() as i64
}

/// Ranking used by best-match selection; smaller is better.
///
/// Rotation distance dominates. Among equal rotation distance, a snapshot at or
/// above the target scale beats any below it; above-target snapshots prefer
/// the closest scale, below-target ones the highest.
fn compare_candidates(a: &CachedSnapshot, b: &CachedSnapshot, scale: f32, rotation: Rotation) -> Ordering {
    let rank = |s: &CachedSnapshot| {
        let below = s.scale < scale;
        let distance = (s.scale - scale).abs();
        (s.rotation.difference(rotation), below, distance)
    };
    let (ra, ba, da) = rank(a);
    let (rb, bb, db) = rank(b);
    ra.cmp(&rb)
        .then(ba.cmp(&bb))
        .then(da.total_cmp(&db))
        // ties go to the fresher capture
        .then(b.captured_at.cmp(&a.captured_at))
}

/// Snapshot store for the main page column
#[derive(Debug)]
pub struct RenderCacheStore {
    pages: Arc<SnapshotMap>,
    page_count: u32,
    max_per_page: usize,
    evictions: u64,
    duplicates: u64,
    hits: u64,
    misses: u64,
}

impl RenderCacheStore {
    /// Create an empty store. A cap of zero is treated as one.
    pub fn new(max_per_page: usize) -> Self {
        Self {
            pages: Arc::new(HashMap::new()),
            page_count: 0,
            max_per_page: max_per_page.max(1),
            evictions: 0,
            duplicates: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Set the document page count, dropping snapshots for pages past the end.
    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
        if self.pages.keys().any(|&page| page > page_count) {
            let next: SnapshotMap = self
                .pages
                .iter()
                .filter(|(&page, _)| page <= page_count)
                .map(|(&page, list)| (page, list.clone()))
                .collect();
            self.pages = Arc::new(next);
        }
    }

    /// Store a snapshot of `page` rendered at `scale` / `rotation`.
    ///
    /// At most one snapshot is kept per scale. A capture at a held scale but a
    /// different rotation replaces that entry rather than being skipped. When
    /// the page already holds `max_per_page` snapshots, the oldest captures
    /// are evicted.
    pub fn capture(
        &mut self,
        page: u32,
        image: SnapshotImage,
        scale: f32,
        rotation: Rotation,
        captured_at: Instant,
    ) -> CaptureOutcome {
        if page == 0 || page > self.page_count {
            return CaptureOutcome::OutOfRange;
        }
        if !scale.is_finite() || scale <= 0.0 {
            return CaptureOutcome::InvalidScale;
        }

        let key = scale_key(scale);
        let existing = self
            .pages
            .get(&page)
            .and_then(|list| list.iter().position(|s| scale_key(s.scale) == key));

        let snapshot = CachedSnapshot { image, scale, rotation, captured_at };
        let mut next = SnapshotMap::clone(&self.pages);
        let list = next.entry(page).or_default();

        let outcome = match existing {
            Some(index) if list[index].rotation == rotation => {
                self.duplicates += 1;
                debug!("page {page}: snapshot at scale {scale} already cached");
                return CaptureOutcome::Duplicate;
            }
            Some(index) => {
                list.remove(index);
                list.push(snapshot);
                CaptureOutcome::Replaced
            }
            None => {
                list.push(snapshot);
                let evicted = evict_oldest(list, self.max_per_page);
                self.evictions += evicted as u64;
                if evicted > 0 {
                    CaptureOutcome::StoredWithEviction(evicted)
                } else {
                    CaptureOutcome::Stored
                }
            }
        };

        debug!("page {page}: captured snapshot at scale {scale}, {rotation} ({outcome:?})");
        self.pages = Arc::new(next);
        outcome
    }

    /// Snapshot best suited to stand in for a render at `scale` / `rotation`.
    ///
    /// Returns `None` only when nothing has been captured for the page.
    /// Does not touch the hit/miss counters, so it is safe to call per frame.
    pub fn best_match(&self, page: u32, scale: f32, rotation: Rotation) -> Option<&CachedSnapshot> {
        self.pages
            .get(&page)
            .and_then(|list| list.iter().min_by(|a, b| compare_candidates(a, b, scale, rotation)))
    }

    /// Count a stand-in lookup for a page that just went stale. Returns
    /// whether a snapshot was available.
    pub fn record_lookup(&mut self, page: u32, scale: f32, rotation: Rotation) -> bool {
        let found = self.best_match(page, scale, rotation).is_some();
        if found {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// All snapshots for `page`, oldest first.
    pub fn snapshots(&self, page: u32) -> &[CachedSnapshot] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_snapshot(&self, page: u32) -> bool {
        !self.snapshots(page).is_empty()
    }

    /// Drop every snapshot for `page`. Returns how many were released.
    pub fn remove_page(&mut self, page: u32) -> usize {
        if !self.pages.contains_key(&page) {
            return 0;
        }
        let mut next = SnapshotMap::clone(&self.pages);
        let released = next.remove(&page).map_or(0, |list| list.len());
        self.pages = Arc::new(next);
        released
    }

    /// Release all snapshots.
    pub fn clear(&mut self) {
        if !self.pages.is_empty() {
            debug!("releasing {} cached snapshots", self.len());
        }
        self.pages = Arc::new(HashMap::new());
    }

    /// Total number of snapshots across all pages.
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.values().all(Vec::is_empty)
    }

    /// Cheap handle on the current page map. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<SnapshotMap> {
        Arc::clone(&self.pages)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            snapshot_count: self.len(),
            bytes_used: self.pages.values().flatten().map(|s| s.image.byte_len()).sum(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            duplicates: self.duplicates,
        }
    }
}

impl Default for RenderCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOTS_PER_PAGE)
    }
}

/// Drop the oldest captures until `list` fits in `cap`. Returns the number dropped.
fn evict_oldest(list: &mut Vec<CachedSnapshot>, cap: usize) -> usize {
    let mut evicted = 0;
    while list.len() > cap {
        let oldest = list
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.captured_at)
            .map(|(index, _)| index);
        match oldest {
            Some(index) => {
                list.remove(index);
                evicted += 1;
            }
            None => break,
        }
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn image() -> SnapshotImage {
        let surface = RgbaImage::from_pixel(6, 8, Rgba([255, 255, 255, 255]));
        SnapshotImage::encode(&surface, 80).unwrap()
    }

    fn store(cap: usize) -> RenderCacheStore {
        let mut store = RenderCacheStore::new(cap);
        store.set_page_count(10);
        store
    }

    #[test]
    fn test_capture_is_idempotent_per_scale() {
        let mut store = store(2);
        let t0 = Instant::now();

        assert_eq!(store.capture(3, image(), 1.0, Rotation::Deg0, t0), CaptureOutcome::Stored);
        assert_eq!(
            store.capture(3, image(), 1.0, Rotation::Deg0, t0 + Duration::from_millis(5)),
            CaptureOutcome::Duplicate
        );
        assert_eq!(store.snapshots(3).len(), 1);
        assert_eq!(store.snapshots(3)[0].captured_at, t0);
        assert_eq!(store.stats().duplicates, 1);
    }

    #[test]
    fn test_same_scale_new_rotation_replaces_entry() {
        let mut store = store(2);
        let t0 = Instant::now();
        store.capture(3, image(), 1.0, Rotation::Deg0, t0);

        let outcome = store.capture(3, image(), 1.0, Rotation::Deg90, t0 + Duration::from_millis(1));
        assert_eq!(outcome, CaptureOutcome::Replaced);
        assert_eq!(store.snapshots(3).len(), 1);
        assert_eq!(store.snapshots(3)[0].rotation, Rotation::Deg90);
    }

    #[test]
    fn test_best_match_prefers_rotation_then_higher_scale() {
        let mut store = store(4);
        let t0 = Instant::now();
        store.capture(1, image(), 1.0, Rotation::Deg0, t0);
        store.capture(1, image(), 1.5, Rotation::Deg0, t0);
        store.capture(1, image(), 1.2, Rotation::Deg90, t0);
        store.capture(1, image(), 1.25, Rotation::Deg90, t0);

        let best = store.best_match(1, 1.2, Rotation::Deg0).unwrap();
        assert_eq!(best.rotation, Rotation::Deg0);
        assert_eq!(best.scale, 1.5);

        let best = store.best_match(1, 1.2, Rotation::Deg90).unwrap();
        assert_eq!(best.scale, 1.2);
    }

    #[test]
    fn test_best_match_falls_back_to_highest_below_target() {
        let mut store = store(4);
        let t0 = Instant::now();
        store.capture(2, image(), 0.5, Rotation::Deg0, t0);
        store.capture(2, image(), 1.0, Rotation::Deg0, t0);

        let best = store.best_match(2, 2.0, Rotation::Deg0).unwrap();
        assert_eq!(best.scale, 1.0);
    }

    #[test]
    fn test_best_match_uses_other_rotation_when_nothing_else_exists() {
        let mut store = store(2);
        store.capture(4, image(), 1.0, Rotation::Deg270, Instant::now());

        let best = store.best_match(4, 2.0, Rotation::Deg0).unwrap();
        let transform = best.transform_to(2.0, Rotation::Deg0);
        assert_eq!(transform.rotate, Rotation::Deg90);
        assert_eq!(transform.scale, 2.0);

        assert!(store.best_match(5, 1.0, Rotation::Deg0).is_none());
    }

    #[test]
    fn test_only_recorded_lookups_are_counted() {
        let mut store = store(2);
        store.capture(4, image(), 1.0, Rotation::Deg0, Instant::now());

        for _ in 0..5 {
            assert!(store.best_match(4, 2.0, Rotation::Deg0).is_some());
        }
        assert_eq!((store.stats().hits, store.stats().misses), (0, 0));

        assert!(store.record_lookup(4, 2.0, Rotation::Deg0));
        assert!(!store.record_lookup(5, 2.0, Rotation::Deg0));
        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_cap_evicts_oldest_capture() {
        let mut store = store(2);
        let t0 = Instant::now();
        store.capture(1, image(), 1.0, Rotation::Deg0, t0);
        store.capture(1, image(), 1.5, Rotation::Deg0, t0 + Duration::from_millis(10));

        let outcome = store.capture(1, image(), 2.0, Rotation::Deg0, t0 + Duration::from_millis(20));
        assert_eq!(outcome, CaptureOutcome::StoredWithEviction(1));

        let scales: Vec<f32> = store.snapshots(1).iter().map(|s| s.scale).collect();
        assert_eq!(scales, vec![1.5, 2.0]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_page_range_is_enforced() {
        let mut store = store(2);
        let t0 = Instant::now();
        assert_eq!(store.capture(0, image(), 1.0, Rotation::Deg0, t0), CaptureOutcome::OutOfRange);
        assert_eq!(store.capture(11, image(), 1.0, Rotation::Deg0, t0), CaptureOutcome::OutOfRange);
        assert_eq!(store.capture(2, image(), f32::NAN, Rotation::Deg0, t0), CaptureOutcome::InvalidScale);

        store.capture(9, image(), 1.0, Rotation::Deg0, t0);
        store.capture(2, image(), 1.0, Rotation::Deg0, t0);
        store.set_page_count(5);
        assert!(!store.has_snapshot(9));
        assert!(store.has_snapshot(2));
    }

    #[test]
    fn test_snapshot_handle_is_unaffected_by_writes() {
        let mut store = store(2);
        let t0 = Instant::now();
        store.capture(1, image(), 1.0, Rotation::Deg0, t0);

        let before = store.snapshot();
        store.capture(1, image(), 2.0, Rotation::Deg0, t0);
        store.remove_page(1);

        assert_eq!(before.get(&1).map(Vec::len), Some(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut store = store(2);
        let t0 = Instant::now();
        for page in 1..=3 {
            store.capture(page, image(), 1.0, Rotation::Deg0, t0);
        }
        assert_eq!(store.len(), 3);
        assert!(store.stats().bytes_used > 0);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.stats().bytes_used, 0);
    }
}
