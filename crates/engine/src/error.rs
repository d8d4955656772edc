use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    EmptyDocument,
    #[error("invalid render scale {0}")]
    InvalidScale(f32),
    #[error("surface of {width}x{height} pixels is too large")]
    SurfaceTooLarge { width: u32, height: u32 },
    #[error("backend error: {0}")]
    Backend(String),
}
