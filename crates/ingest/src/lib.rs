pub mod rasterizer;

pub use rasterizer::PdftoppmRasterizer;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// One page of a source document: an opaque base64-JPEG payload plus its
/// 1-based ordinal. Immutable once produced; page order is document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub ordinal: u32,
    /// Base64-encoded JPEG bytes, without a `data:` prefix.
    pub data: String,
}

impl PageImage {
    pub fn new(ordinal: u32, data: impl Into<String>) -> Self {
        Self {
            ordinal,
            data: data.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("pdftoppm is not installed or not on PATH")]
    ConverterMissing,
    #[error("pdftoppm failed: {0}")]
    Converter(String),
    #[error("io failure during rasterization: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a source document into its ordered page images. No partial
/// results: a document either rasterizes completely or the call fails.
#[allow(async_fn_in_trait)]
pub trait PageSource: Send + Sync {
    async fn rasterize(&self, document: &Path) -> Result<Vec<PageImage>, RasterizeError>;
}
