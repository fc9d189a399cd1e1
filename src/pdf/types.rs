//! Core types for page rendering

/// Pixel dimensions of a page rendered at a given scale.
///
/// The drawing surface and the tag layer are always sized to the same
/// viewport; tag coordinates only mean something relative to one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Viewport of a page of `page_width` x `page_height` points at `scale`.
    ///
    /// Truncates to whole device pixels and never yields an empty axis, so the
    /// mapping is deterministic for equal inputs.
    #[must_use]
    pub fn from_page_size(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width: scaled_dim(page_width, scale),
            height: scaled_dim(page_height, scale),
        }
    }

    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn scaled_dim(points: f32, scale: f32) -> u32 {
    let px = (points * scale).floor();
    if px.is_finite() && px >= 1.0 {
        px as u32
    } else {
        1
    }
}

/// Raw rendered page raster.
///
/// RGB pixel data (3 bytes per pixel) sized exactly to `viewport`.
#[derive(Clone)]
pub struct PageSurface {
    /// Raw RGB pixel data
    pub pixels: Vec<u8>,
    /// Surface dimensions
    pub viewport: Viewport,
    /// Page number (1-based)
    pub page: usize,
    /// Scale the page was rasterized at
    pub scale: f32,
}

impl PageSurface {
    /// Blank white surface for `viewport`.
    #[must_use]
    pub fn blank(page: usize, scale: f32, viewport: Viewport) -> Self {
        Self {
            pixels: vec![0xFF; viewport.pixel_count() * 3],
            viewport,
            page,
            scale,
        }
    }

    /// Packs strided samples with `channels` bytes per pixel into tight RGB
    /// rows, dropping anything past the third channel. `None` when the
    /// buffer is too short or has fewer than three channels.
    #[must_use]
    pub fn from_samples(
        page: usize,
        scale: f32,
        viewport: Viewport,
        samples: &[u8],
        stride: usize,
        channels: usize,
    ) -> Option<Self> {
        if channels < 3 {
            return None;
        }
        let (width, height) = (viewport.width as usize, viewport.height as usize);
        let used = width * channels;
        let rows: Vec<&[u8]> = samples
            .chunks(stride.max(1))
            .take(height)
            .filter_map(|row| row.get(..used))
            .collect();
        if rows.len() != height {
            return None;
        }

        let pixels = rows
            .into_iter()
            .flat_map(|row| row.chunks_exact(channels).flat_map(|px| &px[..3]))
            .copied()
            .collect();
        Some(Self {
            pixels,
            viewport,
            page,
            scale,
        })
    }
}

impl std::fmt::Debug for PageSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSurface")
            .field("page", &self.page)
            .field("scale", &self.scale)
            .field("viewport", &self.viewport)
            .field("pixels_len", &self.pixels.len())
            .finish_non_exhaustive()
    }
}
