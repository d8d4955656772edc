//! Pageview Layout Library
//!
//! Geometry for a virtualized page column: per-page intrinsic sizes, zoom and
//! rotation state, the size estimator fed to the viewport window, the window
//! itself, and the current-page tracker.
//!
//! # Example
//!
//! ```
//! use pageview_layout::{
//!     DimensionStore, PageDimensions, Rotation, SizeEstimator, ViewportWindow, VirtualWindow,
//! };
//!
//! let dims = DimensionStore::new(PageDimensions::new(500.0, 1000.0));
//! let estimator = SizeEstimator::default();
//!
//! let mut window = VirtualWindow::new(800.0, 2);
//! window.set_count(10, &|index| estimator.estimate(index, 1.0, Rotation::Deg0, &dims));
//! assert_eq!(window.total_extent(), 10_200.0);
//! ```

pub mod dimensions;
pub mod estimator;
pub mod rotation;
pub mod tracker;
pub mod window;
pub mod zoom;

pub use dimensions::{DimensionStore, DimensionUpdate, PageDimensions};
pub use estimator::{SizeEstimator, ThumbnailEstimator, DEFAULT_PAGE_MARGIN};
pub use rotation::Rotation;
pub use tracker::{nearest_page, CurrentPageTracker, DEFAULT_TRACKER_INTERVAL};
pub use window::{ViewportWindow, VirtualItem, VirtualWindow, DEFAULT_OVERSCAN};
pub use zoom::{ZoomLimits, ZoomState};
