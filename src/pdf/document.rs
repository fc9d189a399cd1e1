//! Document session - owns the decoded document and talks to the rasterizer

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};

use super::request::RasterizeError;
use super::types::PageSurface;

/// The only document type the viewer opens.
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Generations are unique per process so surfaces cached or in flight for one
/// session's document can never be mistaken for another's.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Bytes that could not be turned into a navigable document
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("document is empty")]
    Empty,

    #[error("unsupported document type (expected {PDF_MIME})")]
    UnsupportedType,

    #[error("document has no pages")]
    NoPages,

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Invalid { detail: String },
}

impl DecodeError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid { detail: msg.into() }
    }
}

/// MIME type of `bytes` if it is a document type the viewer accepts.
///
/// Leading whitespace before the header is tolerated, like most readers do.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    bytes[start..].starts_with(PDF_MAGIC).then_some(PDF_MIME)
}

/// The rasterization collaborator.
///
/// `Document` is opened separately on every thread that needs it, so it does
/// not have to be `Send`; the backend itself is shared.
pub trait RasterBackend: Send + Sync + 'static {
    type Document;

    /// Parse raw bytes into a navigable document
    fn open(&self, bytes: &[u8]) -> Result<Self::Document, DecodeError>;

    fn page_count(&self, doc: &Self::Document) -> Result<usize, DecodeError>;

    /// Rasterize `page` (1-based) at `scale`. The returned surface must be
    /// sized exactly to its viewport.
    fn rasterize(
        &self,
        doc: &Self::Document,
        page: usize,
        scale: f32,
    ) -> Result<PageSurface, RasterizeError>;
}

/// Opaque, cheaply cloneable reference to a loaded document.
///
/// Immutable once created. Every load produces a new generation so work
/// issued against a superseded handle can be recognised.
#[derive(Clone)]
pub struct DocumentHandle {
    generation: u64,
    bytes: Arc<[u8]>,
    page_count: usize,
}

impl DocumentHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("generation", &self.generation)
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Owns the current document handle.
pub struct DocumentSession<B: RasterBackend> {
    backend: Arc<B>,
    handle: Option<DocumentHandle>,
}

impl<B: RasterBackend> DocumentSession<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            handle: None,
        }
    }

    /// Decode `bytes` and make the result the current document.
    ///
    /// On failure nothing changes: the previous document, if any, stays current.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<DocumentHandle, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let doc = self.backend.open(&bytes)?;
        let page_count = self.backend.page_count(&doc)?;
        if page_count == 0 {
            return Err(DecodeError::NoPages);
        }

        let handle = DocumentHandle {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            bytes: Arc::from(bytes),
            page_count,
        };

        if let Some(old) = self.handle.replace(handle.clone()) {
            debug!("Discarding document generation {}", old.generation);
        }
        info!(
            "Loaded document generation {} with {} pages",
            handle.generation, handle.page_count
        );

        Ok(handle)
    }

    #[must_use]
    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    /// Page count of the current document, 0 when nothing is loaded
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.handle.as_ref().map_or(0, DocumentHandle::page_count)
    }
}

/// Per-thread rasterizer that keeps the document for one handle generation
/// open between requests and re-opens it when the generation changes.
pub struct PageRasterizer<B: RasterBackend> {
    backend: Arc<B>,
    open: Option<(u64, B::Document)>,
}

impl<B: RasterBackend> PageRasterizer<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            open: None,
        }
    }

    pub fn rasterize(
        &mut self,
        handle: &DocumentHandle,
        page: usize,
        scale: f32,
    ) -> Result<PageSurface, RasterizeError> {
        if page == 0 || page > handle.page_count {
            return Err(RasterizeError::PageOutOfRange {
                page,
                page_count: handle.page_count,
            });
        }

        let stale = self
            .open
            .as_ref()
            .is_none_or(|(generation, _)| *generation != handle.generation);
        if stale {
            // Drop the old document before decoding the new one.
            self.open = None;
            let doc = self.backend.open(&handle.bytes)?;
            debug!("Worker opened document generation {}", handle.generation);
            self.open = Some((handle.generation, doc));
        }

        let Some((_, doc)) = self.open.as_ref() else {
            return Err(RasterizeError::generic("document not open"));
        };

        let surface = self.backend.rasterize(doc, page, scale)?;
        if surface.pixels.len() != surface.viewport.pixel_count() * 3 {
            warn!(
                "Backend returned {} bytes for viewport {:?}",
                surface.pixels.len(),
                surface.viewport
            );
            return Err(RasterizeError::generic("surface does not match its viewport"));
        }
        Ok(surface)
    }
}
