//! Pageview Engine Library
//!
//! The decode/raster contract the viewer drives, plus two implementations:
//! [`LopdfEngine`] reads page sizes from real PDF files and paints a
//! placeholder surface, [`SyntheticEngine`] serves made-up documents and can
//! be told to fail, for tests and simulations.
//!
//! Page numbers are 1-based throughout.

use image::{ImageBuffer, Rgba};
use pageview_layout::{PageDimensions, Rotation};
use std::path::{Path, PathBuf};

mod error;
mod pdf;
mod synthetic;

pub use error::EngineError;
pub use pdf::{blank_pdf, LopdfEngine};
pub use synthetic::{RenderCall, SyntheticEngine};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Largest edge, in pixels, a single render may produce.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Un-rotated page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self { width_pt, height_pt }
    }

    /// Viewport size at `scale`, before rotation.
    pub fn viewport(self, scale: f32) -> PageDimensions {
        PageDimensions::new(self.width_pt * scale, self.height_pt * scale)
    }

    /// Pixel size of a surface rendered at `scale` / `rotation`.
    pub fn surface_size(self, scale: f32, rotation: Rotation) -> (u32, u32) {
        let rotated = self.viewport(scale).rotated(rotation);
        (
            rotated.width.round().max(1.0) as u32,
            rotated.height.round().max(1.0) as u32,
        )
    }
}

impl From<PageSize> for PageDimensions {
    fn from(size: PageSize) -> Self {
        PageDimensions::new(size.width_pt, size.height_pt)
    }
}

/// Document open progress, in whatever unit the engine reads (bytes for files).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    /// Whole percentage, 0 when the total is unknown.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.loaded.min(self.total) * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Decode/raster engine driven by the viewer
pub trait RasterEngine {
    /// Open a document, reporting progress along the way.
    fn open(
        &mut self,
        source: OpenSource,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<DocumentHandle, EngineError>;

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError>;

    /// Intrinsic size of `page` (1-based).
    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, EngineError>;

    /// Viewport metrics of `page` at `scale`, before rotation.
    fn viewport(&self, handle: DocumentHandle, page: u32, scale: f32) -> Result<PageDimensions, EngineError> {
        Ok(self.page_size(handle, page)?.viewport(scale))
    }

    /// Rasterize `page` at `scale`, rotated clockwise by `rotation`.
    fn render(
        &self,
        handle: DocumentHandle,
        page: u32,
        scale: f32,
        rotation: Rotation,
    ) -> Result<RgbaImage, EngineError>;

    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError>;
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Check a page number against the document length.
pub(crate) fn check_page(page: u32, page_count: u32) -> Result<usize, EngineError> {
    if page == 0 || page > page_count {
        return Err(EngineError::PageOutOfRange { page, page_count });
    }
    Ok(page as usize - 1)
}

/// Validate a render scale and compute the output surface size.
pub(crate) fn surface_for(size: PageSize, scale: f32, rotation: Rotation) -> Result<(u32, u32), EngineError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(EngineError::InvalidScale(scale));
    }
    let (width, height) = size.surface_size(scale, rotation);
    if width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(EngineError::SurfaceTooLarge { width, height });
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_swaps_axes_for_quarter_turns() {
        let size = PageSize::new(100.0, 200.0);
        assert_eq!(size.surface_size(1.5, Rotation::Deg0), (150, 300));
        assert_eq!(size.surface_size(1.5, Rotation::Deg90), (300, 150));
        assert_eq!(size.surface_size(0.001, Rotation::Deg0), (1, 1));
    }

    #[test]
    fn progress_percent_handles_unknown_total() {
        assert_eq!(LoadProgress { loaded: 5, total: 0 }.percent(), 0);
        assert_eq!(LoadProgress { loaded: 1, total: 3 }.percent(), 33);
        assert_eq!(LoadProgress { loaded: 9, total: 3 }.percent(), 100);
    }

    #[test]
    fn render_guards_reject_bad_scales() {
        assert!(matches!(
            surface_for(PageSize::LETTER, 0.0, Rotation::Deg0),
            Err(EngineError::InvalidScale(_))
        ));
        assert!(matches!(
            surface_for(PageSize::LETTER, 100.0, Rotation::Deg0),
            Err(EngineError::SurfaceTooLarge { .. })
        ));
        assert!(matches!(check_page(0, 3), Err(EngineError::PageOutOfRange { page: 0, page_count: 3 })));
        assert_eq!(check_page(3, 3).unwrap(), 2);
    }
}
