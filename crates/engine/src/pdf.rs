//! PDF-backed engine
//!
//! Page geometry comes from the file's `MediaBox` entries (following the page
//! tree up through `Parent` when a page inherits its box). Rasterization is a
//! placeholder: a white sheet with a grey frame and a dark header band, so
//! that orientation survives rotation and is visible in snapshots.

use crate::{check_page, surface_for, DocumentHandle, EngineError, LoadProgress, OpenSource, PageSize, RasterEngine, RgbaImage};
use image::{imageops, Rgba};
use log::debug;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pageview_layout::Rotation;
use std::collections::HashMap;
use std::fs;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FRAME: Rgba<u8> = Rgba([220, 220, 220, 255]);
const HEADER: Rgba<u8> = Rgba([60, 60, 60, 255]);

/// Parent chain depth limit when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, EngineError> {
        if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(EngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let mut sizes = Vec::new();
        for (_, object_id) in doc.get_pages() {
            let size = media_box(&doc, object_id)?.unwrap_or(PageSize::LETTER);
            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(EngineError::EmptyDocument);
        }
        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, EngineError> {
        self.docs.get(&handle).ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> Result<Option<PageSize>, EngineError> {
    let mut dict = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(size) = dict.get(b"MediaBox").ok().and_then(rect_size) {
            return Ok(Some(size));
        }
        match parent(doc, dict) {
            Some(next) => dict = next,
            None => break,
        }
    }
    Ok(None)
}

fn parent<'a>(doc: &'a Document, dict: &Dictionary) -> Option<&'a Dictionary> {
    let id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    doc.get_dictionary(id).ok()
}

fn rect_size(obj: &Object) -> Option<PageSize> {
    let array = obj.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    let size = PageSize::new((x1 - x0).abs(), (y1 - y0).abs());
    (size.width_pt > 0.0 && size.height_pt > 0.0).then_some(size)
}

fn paint_placeholder(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, PAPER);
    if width < 4 || height < 4 {
        return image;
    }

    let band = (height / 12).max(1);
    for y in 0..band {
        for x in 0..width {
            image.put_pixel(x, y, HEADER);
        }
    }
    for x in 0..width {
        image.put_pixel(x, height - 1, FRAME);
    }
    for y in band..height {
        image.put_pixel(0, y, FRAME);
        image.put_pixel(width - 1, y, FRAME);
    }
    image
}

impl RasterEngine for LopdfEngine {
    fn open(
        &mut self,
        source: OpenSource,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<DocumentHandle, EngineError> {
        let bytes = match source {
            OpenSource::Path(path) => {
                let total = fs::metadata(&path)?.len();
                progress(LoadProgress { loaded: 0, total });
                fs::read(path)?
            }
            OpenSource::Bytes(bytes) => bytes,
        };
        let total = bytes.len() as u64;
        progress(LoadProgress { loaded: total, total });

        let page_sizes = Self::parse_sizes(&bytes)?;
        debug!("opened PDF with {} pages ({} bytes)", page_sizes.len(), total);

        self.next_handle += 1;
        let handle = DocumentHandle::new(self.next_handle);
        self.docs.insert(handle, DocumentRecord { page_sizes });
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, EngineError> {
        let sizes = &self.record(handle)?.page_sizes;
        let index = check_page(page, sizes.len() as u32)?;
        Ok(sizes[index])
    }

    fn render(
        &self,
        handle: DocumentHandle,
        page: u32,
        scale: f32,
        rotation: Rotation,
    ) -> Result<RgbaImage, EngineError> {
        let size = self.page_size(handle, page)?;
        surface_for(size, scale, rotation)?;

        let (width, height) = size.surface_size(scale, Rotation::Deg0);
        let upright = paint_placeholder(width, height);
        Ok(match rotation {
            Rotation::Deg0 => upright,
            Rotation::Deg90 => imageops::rotate90(&upright),
            Rotation::Deg180 => imageops::rotate180(&upright),
            Rotation::Deg270 => imageops::rotate270(&upright),
        })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}

/// Build a minimal PDF with one empty page per entry of `sizes`.
pub fn blank_pdf(sizes: &[PageSize]) -> Result<Vec<u8>, EngineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(sizes.len());
    for size in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(size.width_pt),
                Object::from(size.height_pt),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => sizes.len() as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}
