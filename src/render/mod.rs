//! Software rasterizer for documents.
//!
//! Every object is rasterized in its own local space and then composited
//! onto the canvas through the inverse of its transform. The result is at
//! logical resolution; zoom is applied by the UI when it draws the texture.

mod export;
mod filters;
mod shapes;
mod text;

use egui::{Color32, Pos2, Rect, vec2};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

pub use export::{ExportFormat, encode};
pub use filters::{FilterCache, apply_filters};
pub use text::FontBook;

use crate::document::{
    Document, IDENTITY, LineComposite, Matrix, Object, ObjectKind, Transform, apply_matrix,
    invert_matrix, map_rect, multiply_matrices,
};
use crate::engine::SourceStore;

/// Longest side of any intermediate raster
pub(crate) const MAX_RASTER_SIDE: f32 = 8192.0;

/// Objects are never rasterized finer than this many pixels per local unit
const MAX_RESOLUTION: f32 = 4.0;

/// Pixels of one object in its local coordinate space
#[derive(Clone)]
pub(crate) struct LocalRaster {
    pub pixels: Arc<RgbaImage>,
    /// Local coordinate of the raster's top-left corner
    pub origin: Pos2,
    /// Raster pixels per local unit
    pub resolution: f32,
}

pub(crate) fn raster_size(bounds: Rect, resolution: f32) -> Option<(u32, u32)> {
    if !bounds.is_positive() {
        return None;
    }
    let w = (bounds.width() * resolution).ceil().clamp(1.0, MAX_RASTER_SIDE) as u32;
    let h = (bounds.height() * resolution).ceil().clamp(1.0, MAX_RASTER_SIDE) as u32;
    Some((w, h))
}

/// Premultiplied `0..=1` channels of an egui color
pub(crate) fn premultiplied(color: Color32) -> [f32; 4] {
    color.to_array().map(|c| c as f32 / 255.0)
}

/// Source-over for premultiplied colors
pub(crate) fn over(dst: [f32; 4], src: [f32; 4]) -> [f32; 4] {
    let keep = 1.0 - src[3];
    [
        src[0] + dst[0] * keep,
        src[1] + dst[1] * keep,
        src[2] + dst[2] * keep,
        src[3] + dst[3] * keep,
    ]
}

pub(crate) fn to_rgba(p: [f32; 4]) -> Rgba<u8> {
    let a = p[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |c: f32| ((c / a).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([channel(p[0]), channel(p[1]), channel(p[2]), (a * 255.0).round() as u8])
}

fn from_rgba(p: &Rgba<u8>) -> [f32; 4] {
    let a = p.0[3] as f32 / 255.0;
    [
        p.0[0] as f32 / 255.0 * a,
        p.0[1] as f32 / 255.0 * a,
        p.0[2] as f32 / 255.0 * a,
        a,
    ]
}

/// Premultiplied working surface
struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Surface {
    fn new(width: u32, height: u32, fill: Color32) -> Self {
        Self {
            width,
            height,
            pixels: vec![premultiplied(fill); (width as usize) * (height as usize)],
        }
    }

    fn composite(&mut self, raster: &LocalRaster, matrix: &Matrix, opacity: f32, composite: LineComposite) {
        let to_local = [
            [1.0 / raster.resolution, 0.0, raster.origin.x],
            [0.0, 1.0 / raster.resolution, raster.origin.y],
            [0.0, 0.0, 1.0],
        ];
        let to_canvas = multiply_matrices(matrix, &to_local);
        let Some(from_canvas) = invert_matrix(&to_canvas) else {
            return;
        };
        let (rw, rh) = raster.pixels.dimensions();
        let footprint = map_rect(
            &to_canvas,
            Rect::from_min_size(Pos2::ZERO, vec2(rw as f32, rh as f32)),
        );
        let area = footprint.intersect(Rect::from_min_size(
            Pos2::ZERO,
            vec2(self.width as f32, self.height as f32),
        ));
        if !area.is_positive() {
            return;
        }

        let (x0, y0) = (area.min.x.floor() as u32, area.min.y.floor() as u32);
        let x1 = (area.max.x.ceil() as u32).min(self.width);
        let y1 = (area.max.y.ceil() as u32).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let src = apply_matrix(&from_canvas, Pos2::new(x as f32 + 0.5, y as f32 + 0.5));
                let sample = bilinear(&raster.pixels, src.x - 0.5, src.y - 0.5);
                let alpha = sample[3] * opacity;
                if alpha <= 0.0 {
                    continue;
                }
                let dst = &mut self.pixels[(y * self.width + x) as usize];
                *dst = match composite {
                    LineComposite::Normal => over(*dst, sample.map(|c| c * opacity)),
                    LineComposite::Erase => dst.map(|c| c * (1.0 - alpha)),
                };
            }
        }
    }

    fn into_image(self) -> RgbaImage {
        let width = self.width;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            to_rgba(self.pixels[(y * width + x) as usize])
        })
    }
}

/// Premultiplied bilinear sample; outside the raster is transparent
fn bilinear(image: &RgbaImage, x: f32, y: f32) -> [f32; 4] {
    let (w, h) = image.dimensions();
    let fetch = |px: i64, py: i64| -> [f32; 4] {
        if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
            [0.0; 4]
        } else {
            from_rgba(image.get_pixel(px as u32, py as u32))
        }
    };
    let (fx, fy) = (x.floor(), y.floor());
    let (tx, ty) = (x - fx, y - fy);
    let (ix, iy) = (fx as i64, fy as i64);
    let a = fetch(ix, iy);
    let b = fetch(ix + 1, iy);
    let c = fetch(ix, iy + 1);
    let d = fetch(ix + 1, iy + 1);
    let mut out = [0.0; 4];
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bottom = c[i] + (d[i] - c[i]) * tx;
        out[i] = top + (bottom - top) * ty;
    }
    out
}

/// Local units per canvas pixel along the object's most stretched axis
fn resolution_for(matrix: &Matrix) -> f32 {
    let sx = (matrix[0][0].powi(2) + matrix[1][0].powi(2)).sqrt();
    let sy = (matrix[0][1].powi(2) + matrix[1][1].powi(2)).sqrt();
    sx.max(sy).clamp(0.05, MAX_RESOLUTION)
}

/// Draws documents and single objects using the engine's pixel sources
pub struct Renderer<'a> {
    sources: &'a SourceStore,
    fonts: &'a FontBook,
    cache: &'a mut FilterCache,
}

impl<'a> Renderer<'a> {
    pub fn new(sources: &'a SourceStore, fonts: &'a FontBook, cache: &'a mut FilterCache) -> Self {
        Self { sources, fonts, cache }
    }

    /// The whole document at logical resolution
    pub fn render_document(&mut self, document: &Document) -> RgbaImage {
        let mut surface = Surface::new(
            document.width.max(1),
            document.height.max(1),
            document.background.base_color(),
        );
        for object in &document.objects {
            self.draw(&mut surface, object, &IDENTITY, 1.0);
        }
        surface.into_image()
    }

    /// A single object in its own unscaled, unrotated space, sized to its local bounds
    pub fn render_object(&mut self, object: &Object) -> Option<RgbaImage> {
        let bounds = object.local_bounds();
        let (width, height) = raster_size(bounds, 1.0)?;
        let mut local = object.clone();
        local.transform = Transform::at(Pos2::ZERO - bounds.min.to_vec2());
        local.opacity = 1.0;
        local.visible = true;
        let mut surface = Surface::new(width, height, Color32::TRANSPARENT);
        self.draw(&mut surface, &local, &IDENTITY, 1.0);
        Some(surface.into_image())
    }

    fn draw(&mut self, surface: &mut Surface, object: &Object, parent: &Matrix, parent_opacity: f32) {
        if !object.visible {
            return;
        }
        let matrix = multiply_matrices(parent, &object.matrix());
        let opacity = parent_opacity * object.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        if let ObjectKind::Group { children } = &object.kind {
            for child in children {
                self.draw(surface, child, &matrix, opacity);
            }
            return;
        }
        let composite = match &object.kind {
            ObjectKind::Line { composite, .. } => *composite,
            _ => LineComposite::Normal,
        };
        if let Some(raster) = self.rasterize(object, resolution_for(&matrix)) {
            surface.composite(&raster, &matrix, opacity, composite);
        }
    }

    fn rasterize(&mut self, object: &Object, resolution: f32) -> Option<LocalRaster> {
        match &object.kind {
            ObjectKind::Image(image) => {
                let Some(source) = self.sources.get(image.source) else {
                    log::warn!("Image {} references a missing pixel source", object.id);
                    return None;
                };
                let pixels = self.cache.get_or_apply(image.source, &source, &image.filters);
                let resolution = pixels.width() as f32 / image.natural_width.max(1) as f32;
                Some(LocalRaster {
                    pixels,
                    origin: Pos2::ZERO,
                    resolution,
                })
            }
            ObjectKind::Text(text) => self.fonts.rasterize(text, resolution),
            ObjectKind::Group { .. } => None,
            kind => shapes::rasterize_shape(kind, object.local_bounds(), resolution),
        }
    }
}
