//! Viewer error taxonomy
//!
//! Only [`ViewerError::DocumentLoad`] is fatal. Every per-page error is
//! logged, kept for the host to inspect, and leaves other pages untouched.

use crate::config::ConfigError;
use pageview_cache::SnapshotError;
use pageview_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The document could not be opened; nothing further renders.
    #[error("failed to load document: {0}")]
    DocumentLoad(#[source] EngineError),

    /// Size probe for a page failed; the page keeps the default size.
    #[error("failed to probe dimensions of page {page}: {source}")]
    PageDimensionProbe { page: u32, source: EngineError },

    /// Render failed; the page stays in the rendering state until retried.
    #[error("failed to render page {page}: {source}")]
    PageRender { page: u32, source: EngineError },

    /// Snapshot could not be encoded; the capture is skipped.
    #[error("failed to capture snapshot of page {page}: {source}")]
    SnapshotCapture { page: u32, source: SnapshotError },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ViewerError {
    /// Whether this error stops the whole viewer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ViewerError::DocumentLoad(_) | ViewerError::Config(_))
    }

    /// Page the error is about, if it concerns a single page.
    pub fn page(&self) -> Option<u32> {
        match self {
            ViewerError::PageDimensionProbe { page, .. }
            | ViewerError::PageRender { page, .. }
            | ViewerError::SnapshotCapture { page, .. } => Some(*page),
            ViewerError::DocumentLoad(_) | ViewerError::Config(_) => None,
        }
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;
