//! Pageview Cache Library
//!
//! Snapshot caching for a virtualized page viewer:
//!
//! - [`SnapshotImage`]: a JPEG-compressed copy of a rendered surface
//! - [`RenderCacheStore`]: per-page snapshots at several scales, with
//!   best-match lookup and a per-page cap
//! - [`ThumbnailCache`]: one thumbnail per page
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use pageview_cache::{RenderCacheStore, SnapshotImage};
//! use pageview_layout::Rotation;
//! use std::time::Instant;
//!
//! let mut cache = RenderCacheStore::new(2);
//! cache.set_page_count(10);
//!
//! let surface = RgbaImage::from_pixel(50, 100, Rgba([255, 255, 255, 255]));
//! let image = SnapshotImage::encode(&surface, 80).unwrap();
//! cache.capture(7, image, 1.0, Rotation::Deg0, Instant::now());
//!
//! // zoomed to 2x: the 1x snapshot stands in, scaled up
//! let best = cache.best_match(7, 2.0, Rotation::Deg0).unwrap();
//! assert_eq!(best.transform_to(2.0, Rotation::Deg0).scale, 2.0);
//! ```

mod render_cache;
mod snapshot;
mod stats;
mod thumbnail;

pub use render_cache::{CaptureOutcome, RenderCacheStore, SnapshotMap, DEFAULT_MAX_SNAPSHOTS_PER_PAGE};
pub use snapshot::{CachedSnapshot, SnapshotError, SnapshotImage, SnapshotTransform, DEFAULT_SNAPSHOT_QUALITY};
pub use stats::CacheStats;
pub use thumbnail::{ThumbnailCache, ThumbnailEntry};
