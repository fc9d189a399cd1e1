//! Render request and response types

use std::sync::Arc;

use super::cancel::CancelToken;
use super::document::{DecodeError, DocumentHandle};
use super::types::PageSurface;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Rasterize one page (1-based) of `doc` at `scale`
    Page {
        id: RequestId,
        doc: DocumentHandle,
        page: usize,
        scale: f32,
        cancel: CancelToken,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Non-cancellation failure while rendering a page
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("reopening document: {0}")]
    Reopen(#[from] DecodeError),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RasterizeError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page
    Page {
        id: RequestId,
        surface: Arc<PageSurface>,
    },

    /// Request observed its cancellation flag and produced nothing
    Cancelled(RequestId),

    /// Error during rendering
    Error { id: RequestId, error: RasterizeError },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Page { id, .. } | Self::Cancelled(id) | Self::Error { id, .. } => *id,
        }
    }
}
