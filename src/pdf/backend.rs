//! MuPDF rasterization backend

use mupdf::{Colorspace, Document, Matrix};

use super::document::{DecodeError, PDF_MIME, RasterBackend};
use super::request::RasterizeError;
use super::types::{PageSurface, Viewport};

/// Rasterizes PDF pages with MuPDF at 72 DPI times the view scale.
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfBackend;

impl RasterBackend for MupdfBackend {
    type Document = Document;

    fn open(&self, bytes: &[u8]) -> Result<Document, DecodeError> {
        Ok(Document::from_bytes(bytes, PDF_MIME)?)
    }

    fn page_count(&self, doc: &Document) -> Result<usize, DecodeError> {
        let count = doc.page_count()?;
        usize::try_from(count).map_err(|_| DecodeError::invalid(format!("page count {count}")))
    }

    fn rasterize(
        &self,
        doc: &Document,
        page: usize,
        scale: f32,
    ) -> Result<PageSurface, RasterizeError> {
        let index = page
            .checked_sub(1)
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| RasterizeError::PageOutOfRange {
                page,
                page_count: doc.page_count().unwrap_or(0).max(0) as usize,
            })?;
        let page_obj = doc.load_page(index)?;

        let transform = Matrix::new_scale(scale, scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = page_obj.to_pixmap(&transform, &rgb, false, false)?;

        let channels = pixmap.n() as usize;
        let viewport = Viewport::new(pixmap.width(), pixmap.height());
        PageSurface::from_samples(
            page,
            scale,
            viewport,
            pixmap.samples(),
            pixmap.stride() as usize,
            channels,
        )
        .ok_or_else(|| {
            RasterizeError::generic(format!(
                "Unusable pixmap: {channels} channels, {}x{}",
                viewport.width, viewport.height
            ))
        })
    }
}
