//! Page rendering infrastructure

#[cfg(feature = "pdf")]
mod backend;
mod cache;
mod cancel;
mod controller;
mod document;
mod request;
mod state;
mod types;
mod worker;
mod zoom;

#[cfg(feature = "pdf")]
pub use backend::MupdfBackend;
pub use cache::{CacheKey, PageCache};
pub use cancel::CancelToken;
pub use controller::{DEFAULT_CACHE_PAGES, RenderController, RenderEvent, RenderPhase};
pub use document::{
    DecodeError, DocumentHandle, DocumentSession, PDF_MIME, PageRasterizer, RasterBackend,
    sniff_mime,
};
pub use request::{RasterizeError, RenderRequest, RenderResponse, RequestId};
pub use state::{Command, Effect, RenderState};
pub use types::*;
pub use zoom::*;
