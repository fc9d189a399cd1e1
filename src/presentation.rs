//! Drawing surface and tag layer, kept at identical dimensions

use std::path::Path;
use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::pdf::{PageSurface, Viewport};
use crate::tags::{Tag, TagRect};

const TAG_COLOR: Rgb<u8> = Rgb([0x1E, 0x40, 0xFF]);
const SELECTED_TAG_COLOR: Rgb<u8> = Rgb([0xFF, 0x20, 0x20]);
const TAG_BORDER_PX: u32 = 2;

/// What is on screen: the last accepted page raster and the size of the tag
/// layer laid over it.
#[derive(Debug, Default)]
pub struct Presentation {
    surface: Option<Arc<PageSurface>>,
    layer: Option<Viewport>,
}

impl Presentation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `surface`, resizing the tag layer to the same viewport.
    pub fn commit(&mut self, surface: Arc<PageSurface>) {
        self.layer = Some(surface.viewport);
        self.surface = Some(surface);
    }

    /// Layout size of the tag layer
    #[must_use]
    pub fn layer(&self) -> Option<Viewport> {
        self.layer
    }

    /// Pixel size of the drawing surface
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.surface.as_ref().map(|s| s.viewport)
    }

    /// Flatten the page and the given tags (projected to `scale`) into one
    /// image. The tag at `selected` is outlined in red, others in blue.
    /// Labels are not drawn.
    #[must_use]
    pub fn compose<'a>(
        &self,
        tags: impl IntoIterator<Item = &'a Tag>,
        selected: Option<usize>,
        scale: f32,
    ) -> Option<RgbImage> {
        let surface = self.surface.as_ref()?;
        let mut img = RgbImage::from_raw(
            surface.viewport.width,
            surface.viewport.height,
            surface.pixels.clone(),
        )?;

        for (i, tag) in tags.into_iter().enumerate() {
            let color = if selected == Some(i) {
                SELECTED_TAG_COLOR
            } else {
                TAG_COLOR
            };
            outline(&mut img, &tag.rect_at(scale), color);
        }

        Some(img)
    }

    /// Compose and write a PNG to `path`
    pub fn save_png<'a>(
        &self,
        path: &Path,
        tags: impl IntoIterator<Item = &'a Tag>,
        selected: Option<usize>,
        scale: f32,
    ) -> anyhow::Result<()> {
        let img = self
            .compose(tags, selected, scale)
            .ok_or_else(|| anyhow::anyhow!("nothing has been rendered yet"))?;
        img.save(path)?;
        Ok(())
    }
}

fn outline(img: &mut RgbImage, rect: &TagRect, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    let x0 = rect.left.max(0.0).floor() as u32;
    let y0 = rect.top.max(0.0).floor() as u32;
    let x1 = (rect.right().ceil().max(0.0) as u32).min(w - 1);
    let y1 = (rect.bottom().ceil().max(0.0) as u32).min(h - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }

    for y in y0..=y1 {
        for x in x0..=x1 {
            let on_border = x < x0 + TAG_BORDER_PX
                || x + TAG_BORDER_PX > x1
                || y < y0 + TAG_BORDER_PX
                || y + TAG_BORDER_PX > y1;
            if on_border {
                img.put_pixel(x, y, color);
            }
        }
    }
}
