//! In-memory engine serving made-up documents
//!
//! Each page renders as a flat colour derived from its page number, with the
//! same header band as the PDF placeholder. Individual operations can be set
//! to fail so error paths can be exercised.

use crate::{check_page, surface_for, DocumentHandle, EngineError, LoadProgress, OpenSource, PageSize, RasterEngine, RgbaImage};
use image::{imageops, Rgba};
use pageview_layout::Rotation;
use std::cell::RefCell;
use std::collections::HashSet;

/// One recorded call to [`RasterEngine::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCall {
    pub page: u32,
    pub scale: f32,
    pub rotation: Rotation,
}

#[derive(Debug, Default)]
pub struct SyntheticEngine {
    page_sizes: Vec<PageSize>,
    open_handle: Option<DocumentHandle>,
    next_handle: u64,
    fail_open: bool,
    failing_probes: HashSet<u32>,
    failing_renders: HashSet<u32>,
    renders: RefCell<Vec<RenderCall>>,
}

impl SyntheticEngine {
    pub fn new(page_sizes: Vec<PageSize>) -> Self {
        Self { page_sizes, ..Self::default() }
    }

    /// `count` pages of the same size.
    pub fn uniform(count: u32, size: PageSize) -> Self {
        Self::new(vec![size; count as usize])
    }

    /// Make `open` fail.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Make `page_size` (and so `viewport`) fail for `page`.
    pub fn failing_probe(mut self, page: u32) -> Self {
        self.failing_probes.insert(page);
        self
    }

    /// Make `render` fail for `page`.
    pub fn failing_render(mut self, page: u32) -> Self {
        self.failing_renders.insert(page);
        self
    }

    /// Let a previously failing page render again.
    pub fn heal_render(&mut self, page: u32) {
        self.failing_renders.remove(&page);
    }

    /// Every render call made so far, in order.
    pub fn render_log(&self) -> Vec<RenderCall> {
        self.renders.borrow().clone()
    }

    fn check_handle(&self, handle: DocumentHandle) -> Result<(), EngineError> {
        match self.open_handle {
            Some(open) if open == handle => Ok(()),
            _ => Err(EngineError::InvalidHandle(handle.raw())),
        }
    }
}

fn page_colour(page: u32) -> Rgba<u8> {
    let hue = (page.wrapping_mul(47) % 200) as u8;
    Rgba([55 + hue, 255 - hue, 128, 255])
}

impl RasterEngine for SyntheticEngine {
    fn open(
        &mut self,
        _source: OpenSource,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<DocumentHandle, EngineError> {
        let total = self.page_sizes.len() as u64;
        progress(LoadProgress { loaded: 0, total });
        if self.fail_open {
            return Err(EngineError::Backend("synthetic open failure".to_owned()));
        }
        if self.page_sizes.is_empty() {
            return Err(EngineError::EmptyDocument);
        }
        progress(LoadProgress { loaded: total, total });

        self.next_handle += 1;
        let handle = DocumentHandle::new(self.next_handle);
        self.open_handle = Some(handle);
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError> {
        self.check_handle(handle)?;
        Ok(self.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, EngineError> {
        self.check_handle(handle)?;
        let index = check_page(page, self.page_sizes.len() as u32)?;
        if self.failing_probes.contains(&page) {
            return Err(EngineError::Backend(format!("synthetic probe failure on page {page}")));
        }
        Ok(self.page_sizes[index])
    }

    fn render(
        &self,
        handle: DocumentHandle,
        page: u32,
        scale: f32,
        rotation: Rotation,
    ) -> Result<RgbaImage, EngineError> {
        self.check_handle(handle)?;
        let index = check_page(page, self.page_sizes.len() as u32)?;
        self.renders.borrow_mut().push(RenderCall { page, scale, rotation });
        if self.failing_renders.contains(&page) {
            return Err(EngineError::Backend(format!("synthetic render failure on page {page}")));
        }

        let size = self.page_sizes[index];
        surface_for(size, scale, rotation)?;
        let (width, height) = size.surface_size(scale, Rotation::Deg0);

        let mut upright = RgbaImage::from_pixel(width, height, page_colour(page));
        let band = (height / 12).max(1).min(height);
        for y in 0..band {
            for x in 0..width {
                upright.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        Ok(match rotation {
            Rotation::Deg0 => upright,
            Rotation::Deg90 => imageops::rotate90(&upright),
            Rotation::Deg180 => imageops::rotate180(&upright),
            Rotation::Deg270 => imageops::rotate270(&upright),
        })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError> {
        self.check_handle(handle)?;
        self.open_handle = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(engine: &mut SyntheticEngine) -> DocumentHandle {
        engine.open(OpenSource::Bytes(Vec::new()), &mut |_| {}).unwrap()
    }

    #[test]
    fn serves_configured_pages() {
        let mut engine = SyntheticEngine::uniform(4, PageSize::new(100.0, 150.0));
        let handle = open(&mut engine);

        assert_eq!(engine.page_count(handle).unwrap(), 4);
        let image = engine.render(handle, 2, 2.0, Rotation::Deg270).unwrap();
        assert_eq!(image.dimensions(), (300, 200));
        assert_eq!(
            engine.render_log(),
            vec![RenderCall { page: 2, scale: 2.0, rotation: Rotation::Deg270 }]
        );
    }

    #[test]
    fn configured_failures_surface_as_errors() {
        let mut engine = SyntheticEngine::uniform(3, PageSize::LETTER).failing_probe(2).failing_render(3);
        let handle = open(&mut engine);

        assert!(engine.page_size(handle, 1).is_ok());
        assert!(matches!(engine.page_size(handle, 2), Err(EngineError::Backend(_))));
        assert!(engine.render(handle, 3, 1.0, Rotation::Deg0).is_err());

        engine.heal_render(3);
        assert!(engine.render(handle, 3, 1.0, Rotation::Deg0).is_ok());
    }

    #[test]
    fn failing_open_still_reports_start() {
        let mut engine = SyntheticEngine::uniform(2, PageSize::LETTER).failing_open();
        let mut seen = Vec::new();
        let result = engine.open(OpenSource::Bytes(Vec::new()), &mut |p| seen.push(p));

        assert!(result.is_err());
        assert_eq!(seen, vec![LoadProgress { loaded: 0, total: 2 }]);
    }

    #[test]
    fn stale_handle_is_rejected_after_close() {
        let mut engine = SyntheticEngine::uniform(1, PageSize::LETTER);
        let handle = open(&mut engine);
        engine.close(handle).unwrap();
        assert!(matches!(engine.page_count(handle), Err(EngineError::InvalidHandle(_))));
    }
}
