//! Render controller - sequences page renders against a single worker
//!
//! At most one request is in flight. Issuing a new one raises the previous
//! request's cancellation flag before the new request is queued, and a
//! settlement is only accepted if it belongs to the request that is still
//! current, so a superseded render can never touch the surface, the layer,
//! or the view.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::cache::PageCache;
use super::cancel::CancelToken;
use super::document::{DocumentHandle, RasterBackend};
use super::request::{RasterizeError, RenderRequest, RenderResponse, RequestId};
use super::state::{Command, Effect, RenderState};
use super::types::Viewport;
use super::worker::render_worker;
use super::zoom::Zoom;
use crate::presentation::Presentation;
use crate::view_state::ViewState;

/// Default number of rendered surfaces kept around
pub const DEFAULT_CACHE_PAGES: usize = 8;

/// Lifecycle of the most recent render request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    Idle,
    Requested,
    InFlight,
    Completed,
    Cancelled,
    Failed,
}

/// Settlement of the current request that the caller should know about.
/// Cancellations are expected and never reported.
#[derive(Debug)]
pub enum RenderEvent {
    Completed {
        page: usize,
        viewport: Viewport,
        /// The page (and so its tag list) differs from the one shown before
        page_changed: bool,
    },
    Failed {
        page: usize,
        error: RasterizeError,
    },
}

#[derive(Debug)]
struct RenderTask {
    id: RequestId,
    page: usize,
    scale: f32,
    generation: u64,
    page_count: usize,
    cancel: CancelToken,
}

/// Owns the render worker, the target state, and what is on screen
pub struct RenderController<B: RasterBackend> {
    state: RenderState,
    doc: Option<DocumentHandle>,
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    current: Option<RenderTask>,
    phase: RenderPhase,
    cache: Arc<Mutex<PageCache>>,
    presentation: Presentation,
    _backend: PhantomData<fn() -> B>,
}

impl<B: RasterBackend> RenderController<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, zoom: Zoom) -> Self {
        Self::with_cache_size(backend, zoom, DEFAULT_CACHE_PAGES)
    }

    #[must_use]
    pub fn with_cache_size(backend: Arc<B>, zoom: Zoom, cache_pages: usize) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_pages)));
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let worker_cache = cache.clone();
        let spawned = std::thread::Builder::new()
            .name("pagetag-render".into())
            .spawn(move || render_worker(backend, request_rx, response_tx, worker_cache));
        if let Err(e) = spawned {
            error!("Failed to start render worker: {e}");
        }

        Self {
            state: RenderState::new(zoom),
            doc: None,
            request_tx,
            response_rx,
            next_request_id: 1,
            current: None,
            phase: RenderPhase::Idle,
            cache,
            presentation: Presentation::new(),
            _backend: PhantomData,
        }
    }

    /// Target page and zoom (what is being rendered or was last rendered)
    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// The drawing surface and tag layer
    #[must_use]
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Switch to a freshly loaded document and render its first page.
    /// Anything still rendering from the old handle is cancelled first.
    pub fn load_document(&mut self, handle: DocumentHandle) -> Option<RequestId> {
        self.abort_in_flight();
        let page_count = handle.page_count();
        self.doc = Some(handle);
        self.apply(Command::DocumentLoaded { page_count })
    }

    /// Apply a command; returns the id of the render it issued, if any
    pub fn apply(&mut self, cmd: Command) -> Option<RequestId> {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects)
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) -> Option<RequestId> {
        let mut issued = None;
        for effect in effects {
            match effect {
                Effect::CancelCurrent => self.abort_in_flight(),

                Effect::InvalidateCache => {
                    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
                    match &self.doc {
                        Some(doc) => cache.retain_generation(doc.generation()),
                        None => cache.invalidate_all(),
                    }
                }

                Effect::RenderCurrentPage => issued = self.request_current(),
            }
        }
        issued
    }

    fn request_current(&mut self) -> Option<RequestId> {
        let Some(doc) = self.doc.clone() else {
            warn!("Render requested with no document loaded");
            return None;
        };

        self.abort_in_flight();

        let id = self.next_id();
        let page = self.state.page;
        let scale = self.state.scale();
        let cancel = CancelToken::new();
        let task = RenderTask {
            id,
            page,
            scale,
            generation: doc.generation(),
            page_count: doc.page_count(),
            cancel: cancel.clone(),
        };

        self.phase = RenderPhase::Requested;
        let sent = self.request_tx.send(RenderRequest::Page {
            id,
            doc,
            page,
            scale,
            cancel,
        });
        if sent.is_err() {
            error!("Render worker is not running, dropping request for page {page}");
            self.phase = RenderPhase::Failed;
            return None;
        }

        debug!("Requested page {page} at scale {scale} as {id:?}");
        self.current = Some(task);
        self.phase = RenderPhase::InFlight;
        Some(id)
    }

    /// Cancel the in-flight request (if any) without issuing another, and
    /// point the target back at what is on screen.
    pub fn cancel_current(&mut self, view: &ViewState) {
        if self.current.is_some() {
            self.abort_in_flight();
            self.state.rollback(view);
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.current.take() {
            task.cancel.cancel();
            self.phase = RenderPhase::Cancelled;
            debug!("Cancelled {:?} (page {})", task.id, task.page);
        }
    }

    /// Drain settled requests without blocking
    pub fn poll(&mut self, view: &mut ViewState) -> Vec<RenderEvent> {
        let mut events = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            if let Some(event) = self.settle(response, view) {
                events.push(event);
            }
        }
        events
    }

    /// Block until the current request settles or `timeout` passes.
    /// Returns `None` if nothing was in flight or the wait timed out.
    pub fn wait(&mut self, view: &mut ViewState, timeout: Duration) -> Option<RenderEvent> {
        let deadline = Instant::now() + timeout;
        while self.current.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(event) = self.settle(response, view) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!("Render still in flight after {timeout:?}");
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Render worker exited with a request in flight");
                    self.current = None;
                    self.phase = RenderPhase::Failed;
                    self.state.rollback(view);
                    return None;
                }
            }
        }
        None
    }

    fn settle(&mut self, response: RenderResponse, view: &mut ViewState) -> Option<RenderEvent> {
        let id = response.id();
        if self.current.as_ref().is_none_or(|task| task.id != id) {
            debug!("Ignoring settlement of superseded {id:?}");
            return None;
        }
        let task = self.current.take()?;

        match response {
            RenderResponse::Page { surface, .. } => {
                let viewport = surface.viewport;
                // Surface and layer first, so tags are never drawn against a
                // viewport they were not captured in.
                self.presentation.commit(surface);
                let page_changed =
                    view.commit_render(task.page, task.scale, task.page_count, task.generation);
                self.phase = RenderPhase::Completed;
                info!(
                    "Rendered page {}/{} at scale {} ({}x{})",
                    task.page, task.page_count, task.scale, viewport.width, viewport.height
                );
                Some(RenderEvent::Completed {
                    page: task.page,
                    viewport,
                    page_changed,
                })
            }

            RenderResponse::Cancelled(_) => {
                self.phase = RenderPhase::Cancelled;
                self.state.rollback(view);
                None
            }

            RenderResponse::Error { error, .. } => {
                error!("Failed to render page {}: {error}", task.page);
                self.phase = RenderPhase::Failed;
                self.state.rollback(view);
                Some(RenderEvent::Failed {
                    page: task.page,
                    error,
                })
            }
        }
    }

    /// Shutdown the worker
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl<B: RasterBackend> Drop for RenderController<B> {
    fn drop(&mut self) {
        self.abort_in_flight();
        self.shutdown();
    }
}
