//! Deterministic stand-in for the PDF engine, used by unit and integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flume::{Receiver, Sender};

use crate::pdf::{DecodeError, PageSurface, RasterBackend, RasterizeError, Viewport};

const FAKE_MAGIC: &str = "FAKEDOC";

/// Letter-size page in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Encode a fake document with the given page sizes (in points).
#[must_use]
pub fn fake_document(pages: &[(f32, f32)]) -> Vec<u8> {
    let mut out = String::from(FAKE_MAGIC);
    out.push('\n');
    for (w, h) in pages {
        out.push_str(&format!("{w}x{h}\n"));
    }
    out.into_bytes()
}

/// Decoded fake document: just the page sizes.
#[derive(Debug)]
pub struct FakeDocument {
    pages: Vec<(f32, f32)>,
}

/// Releases renders held by a gated [`FakeBackend`], one per call.
#[derive(Clone)]
pub struct RenderGate {
    tx: Sender<()>,
}

impl RenderGate {
    pub fn release(&self) {
        let _ = self.tx.send(());
    }
}

/// Backend that "rasterizes" by filling a surface with the page number.
///
/// Optionally gated, so a test can hold a render in flight and issue
/// another request on top of it.
#[derive(Default)]
pub struct FakeBackend {
    failing_pages: HashSet<usize>,
    gate: Option<Receiver<()>>,
    rasterized: AtomicUsize,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every rasterization blocks until the returned gate is released.
    #[must_use]
    pub fn gated() -> (Self, RenderGate) {
        let (tx, rx) = flume::unbounded();
        let backend = Self {
            gate: Some(rx),
            ..Self::default()
        };
        (backend, RenderGate { tx })
    }

    /// Rasterizing `page` fails with a generic error.
    #[must_use]
    pub fn failing_on(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Number of rasterizations actually performed
    #[must_use]
    pub fn rasterized(&self) -> usize {
        self.rasterized.load(Ordering::SeqCst)
    }
}

impl RasterBackend for FakeBackend {
    type Document = FakeDocument;

    fn open(&self, bytes: &[u8]) -> Result<FakeDocument, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::UnsupportedType)?;
        let mut lines = text.lines();
        if lines.next() != Some(FAKE_MAGIC) {
            return Err(DecodeError::UnsupportedType);
        }

        let pages = lines
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                let (w, h) = line
                    .split_once('x')
                    .ok_or_else(|| DecodeError::invalid(format!("bad page size: {line}")))?;
                let w = w.trim().parse::<f32>().map_err(|e| DecodeError::invalid(e.to_string()))?;
                let h = h.trim().parse::<f32>().map_err(|e| DecodeError::invalid(e.to_string()))?;
                Ok((w, h))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(FakeDocument { pages })
    }

    fn page_count(&self, doc: &FakeDocument) -> Result<usize, DecodeError> {
        Ok(doc.pages.len())
    }

    fn rasterize(
        &self,
        doc: &FakeDocument,
        page: usize,
        scale: f32,
    ) -> Result<PageSurface, RasterizeError> {
        if let Some(gate) = &self.gate {
            if gate.recv_timeout(Duration::from_secs(10)).is_err() {
                return Err(RasterizeError::generic("render gate never opened"));
            }
        }

        if self.failing_pages.contains(&page) {
            return Err(RasterizeError::generic(format!("page {page} is corrupt")));
        }

        let &(w, h) = doc
            .pages
            .get(page.wrapping_sub(1))
            .ok_or(RasterizeError::PageOutOfRange {
                page,
                page_count: doc.pages.len(),
            })?;

        self.rasterized.fetch_add(1, Ordering::SeqCst);
        let viewport = Viewport::from_page_size(w, h, scale);
        Ok(PageSurface {
            pixels: vec![page as u8; viewport.pixel_count() * 3],
            viewport,
            page,
            scale,
        })
    }
}
