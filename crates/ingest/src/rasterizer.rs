use crate::{PageImage, PageSource, RasterizeError};
use base64::{Engine as _, engine::general_purpose};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Rasterizes a PDF into per-page JPEG images by shelling out to
/// `pdftoppm` in a scratch directory.
pub struct PdftoppmRasterizer {
    resolution_dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(resolution_dpi: u32) -> Self {
        Self { resolution_dpi }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new(150)
    }
}

impl PageSource for PdftoppmRasterizer {
    async fn rasterize(&self, document: &Path) -> Result<Vec<PageImage>, RasterizeError> {
        if !document.exists() {
            return Err(RasterizeError::NotFound(document.to_path_buf()));
        }

        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");
        info!(document = %document.display(), "rasterizing document");

        let output = Command::new("pdftoppm")
            .arg("-jpeg")
            .arg("-r")
            .arg(self.resolution_dpi.to_string())
            .arg(document)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RasterizeError::ConverterMissing,
                _ => RasterizeError::Io(e),
            })?;

        if !output.status.success() {
            return Err(RasterizeError::Converter(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut page_files = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jpg") {
                page_files.push(path);
            }
        }
        order_page_files(&mut page_files);

        let mut pages = Vec::with_capacity(page_files.len());
        for (index, path) in page_files.iter().enumerate() {
            let bytes = tokio::fs::read(path).await?;
            let ordinal = index as u32 + 1;
            debug!(page = ordinal, bytes = bytes.len(), "encoded page image");
            pages.push(PageImage::new(
                ordinal,
                general_purpose::STANDARD.encode(&bytes),
            ));
        }

        info!(document = %document.display(), pages = pages.len(), "rasterization complete");
        Ok(pages)
    }
}

/// Page files sort by name. pdftoppm zero-pads page numbers to a uniform
/// width per run, so lexicographic order is document page order.
fn order_page_files(paths: &mut [PathBuf]) {
    paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_zero_padded_page_files() {
        let mut paths: Vec<PathBuf> = ["page-10.jpg", "page-02.jpg", "page-01.jpg"]
            .iter()
            .map(PathBuf::from)
            .collect();
        order_page_files(&mut paths);

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["page-01.jpg", "page-02.jpg", "page-10.jpg"]);
    }

    #[tokio::test]
    async fn missing_document_is_a_not_found_error() {
        let rasterizer = PdftoppmRasterizer::default();
        let result = rasterizer
            .rasterize(Path::new("/no/such/document.pdf"))
            .await;

        assert!(matches!(result, Err(RasterizeError::NotFound(_))));
    }
}
