//! Page Viewer Core Library
//!
//! Virtualized page column, render lifecycle and snapshot cache for a
//! paginated document viewer.
//!
//! ```
//! use pageview_core::{SyncDriver, Viewer, ViewerConfig};
//! use pageview_engine::{PageSize, SyntheticEngine};
//! use std::time::Instant;
//!
//! let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
//! viewer.set_viewport_height(800.0);
//!
//! let mut driver = SyncDriver::new(SyntheticEngine::uniform(10, PageSize::new(500.0, 1000.0)));
//! let now = Instant::now();
//! assert!(driver.open(&mut viewer, Vec::new().into(), now));
//! assert_eq!(viewer.scroll_to_page(7, now), 7);
//! ```

pub mod config;
pub mod document;
pub mod driver;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod paint;
pub mod remeasure;
pub mod state;
pub mod thumbnails;
pub mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use document::DocumentStatus;
pub use driver::SyncDriver;
pub use error::{ViewerError, ViewerResult};
pub use events::{Inbox, RenderRequest, RenderedPage, RequestKind, ViewerEvent};
pub use lifecycle::{Completion, LiveSurface, PageLifecycle, PageState, RenderTarget, RenderingSet};
pub use paint::{page_face, thumbnail_face, PageFace, PagePaint};
pub use remeasure::{preserve_relative_offset, remeasure_anchored, remeasure_proportional, RemeasureOutcome};
pub use state::ViewState;
pub use thumbnails::{SidebarState, ThumbnailWindow};
pub use viewer::{TickOutcome, Viewer, ViewerStats};
