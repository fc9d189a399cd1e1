//! Render worker - runs in a dedicated thread

use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::{CacheKey, PageCache};
use super::cancel::CancelToken;
use super::document::{DocumentHandle, PageRasterizer, RasterBackend};
use super::request::{RenderRequest, RenderResponse, RequestId};

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker<B: RasterBackend>(
    backend: Arc<B>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let mut rasterizer = PageRasterizer::new(backend);

    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                doc,
                page,
                scale,
                cancel,
            } => {
                let response =
                    handle_page_request(&mut rasterizer, id, &doc, page, scale, &cancel, &cache);
                if responses.send(response).is_err() {
                    debug!("Render controller is gone, stopping worker");
                    break;
                }
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request<B: RasterBackend>(
    rasterizer: &mut PageRasterizer<B>,
    id: RequestId,
    doc: &DocumentHandle,
    page: usize,
    scale: f32,
    cancel: &CancelToken,
    cache: &Arc<Mutex<PageCache>>,
) -> RenderResponse {
    if cancel.is_cancelled() {
        debug!("Request {id:?} cancelled before rasterizing");
        return RenderResponse::Cancelled(id);
    }

    let key = CacheKey::new(doc.generation(), page, scale);
    let cached = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key);
    if let Some(surface) = cached {
        debug!("Page {page} at {scale} served from cache");
        return RenderResponse::Page { id, surface };
    }

    let result = rasterizer.rasterize(doc, page, scale);

    // Anything produced after cancellation is discarded unseen.
    if cancel.is_cancelled() {
        debug!("Request {id:?} cancelled while rasterizing");
        return RenderResponse::Cancelled(id);
    }

    match result {
        Ok(surface) => {
            let surface = cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, surface);
            RenderResponse::Page { id, surface }
        }
        Err(error) => {
            warn!("Rasterizing page {page} at {scale} failed: {error}");
            RenderResponse::Error { id, error }
        }
    }
}
