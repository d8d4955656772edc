//! What to paint for each live page
//!
//! A rendered page shows its live surface. A page that is rendering shows the
//! best cached snapshot transformed to approximate the target, or a blank
//! placeholder when nothing was ever captured.

use crate::lifecycle::{LiveSurface, PageState};
use pageview_cache::{CachedSnapshot, SnapshotImage, SnapshotTransform, ThumbnailEntry};
use pageview_engine::RgbaImage;
use pageview_layout::{PageDimensions, Rotation};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum PageFace {
    /// The page's own rendered surface
    Live { surface: Arc<RgbaImage>, transform: SnapshotTransform },
    /// A cached stand-in, scaled and rotated towards the target
    Snapshot { image: SnapshotImage, transform: SnapshotTransform },
    /// Nothing to show yet
    Placeholder,
}

impl PageFace {
    pub fn label(&self) -> &'static str {
        match self {
            PageFace::Live { .. } => "live",
            PageFace::Snapshot { .. } => "snapshot",
            PageFace::Placeholder => "placeholder",
        }
    }

    pub fn transform(&self) -> Option<SnapshotTransform> {
        match self {
            PageFace::Live { transform, .. } | PageFace::Snapshot { transform, .. } => Some(*transform),
            PageFace::Placeholder => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, PageFace::Live { .. })
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, PageFace::Snapshot { .. })
    }
}

/// Paint instruction for one item of a window.
#[derive(Debug, Clone)]
pub struct PagePaint {
    /// 1-based page number
    pub page: u32,
    /// Absolute offset of the item
    pub top: f32,
    /// Item height including margin
    pub height: f32,
    /// Page box without margin, as laid out
    pub page_box: PageDimensions,
    pub state: PageState,
    /// Whether this is the current page
    pub current: bool,
    pub face: PageFace,
}

/// Face for a main-column page shown at `visual_scale` / `rotation`.
pub fn page_face(
    state: PageState,
    surface: Option<&LiveSurface>,
    snapshot: Option<&CachedSnapshot>,
    visual_scale: f32,
    rotation: Rotation,
) -> PageFace {
    if state == PageState::Rendered {
        if let Some(surface) = surface {
            return PageFace::Live {
                surface: Arc::clone(&surface.image),
                transform: SnapshotTransform {
                    rotate: surface.target.rotation.delta_to(rotation),
                    scale: visual_scale / surface.target.scale,
                },
            };
        }
    }

    match snapshot {
        Some(snapshot) => PageFace::Snapshot {
            image: snapshot.image.clone(),
            transform: snapshot.transform_to(visual_scale, rotation),
        },
        None => PageFace::Placeholder,
    }
}

/// Face for a thumbnail. The strip's scale never changes, so only rotation
/// needs compensating.
pub fn thumbnail_face(
    state: PageState,
    surface: Option<&LiveSurface>,
    cached: Option<&ThumbnailEntry>,
    rotation: Rotation,
) -> PageFace {
    if state == PageState::Rendered {
        if let Some(surface) = surface {
            return PageFace::Live { surface: Arc::clone(&surface.image), transform: SnapshotTransform::IDENTITY };
        }
    }

    match cached {
        Some(entry) => PageFace::Snapshot {
            image: entry.image.clone(),
            transform: SnapshotTransform { rotate: entry.rotation.delta_to(rotation), scale: 1.0 },
        },
        None => PageFace::Placeholder,
    }
}
