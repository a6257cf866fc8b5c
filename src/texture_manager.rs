use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};

use crate::engine::CanvasEngine;

/// GPU copy of the rendered document, re-uploaded only when the engine's
/// revision moves
#[derive(Default)]
pub struct TextureManager {
    handle: Option<TextureHandle>,
    revision: Option<u64>,
    uploads: u64,
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("revision", &self.revision)
            .field("uploads", &self.uploads)
            .finish()
    }
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    pub fn texture_for(&mut self, ctx: &Context, engine: &CanvasEngine) -> Option<TextureId> {
        if self.revision != Some(engine.revision()) || self.handle.is_none() {
            let Some(pixels) = engine.render() else {
                self.handle = None;
                self.revision = None;
                return None;
            };
            let size = [pixels.width() as usize, pixels.height() as usize];
            let image = ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
            match &mut self.handle {
                Some(handle) => handle.set(image, TextureOptions::LINEAR),
                None => self.handle = Some(ctx.load_texture("document", image, TextureOptions::LINEAR)),
            }
            self.revision = Some(engine.revision());
            self.uploads += 1;
            log::debug!("Uploaded document texture {}x{}", size[0], size[1]);
        }
        self.handle.as_ref().map(|h| h.id())
    }
}
