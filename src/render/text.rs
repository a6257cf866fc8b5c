use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use egui::{Color32, Pos2};
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

use super::{LocalRaster, over, premultiplied, to_rgba};
use crate::document::{TextAlign, TextLine, TextObject, TextStyle};
use crate::error::{EditorError, EditorResult};

/// Horizontal shear applied to synthesize italics
const ITALIC_SHEAR: f32 = 0.2;

/// Widest stroke dilation, in raster pixels
const MAX_STROKE_RADIUS: i32 = 16;

/// Fonts used to measure and rasterize text objects.
///
/// Falls back to egui's bundled fonts. With no font at all, text is measured
/// with a fixed advance and rendered as nothing.
#[derive(Clone, Default)]
pub struct FontBook {
    proportional: Option<FontArc>,
    monospace: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("proportional", &self.proportional.is_some())
            .field("monospace", &self.monospace.is_some())
            .finish()
    }
}

impl FontBook {
    /// The fonts egui embeds with its `default_fonts` feature
    pub fn bundled() -> Self {
        let definitions = egui::FontDefinitions::default();
        let load = |name: &str| {
            definitions
                .font_data
                .get(name)
                .and_then(|data| FontArc::try_from_vec(data.font.to_vec()).ok())
        };
        Self {
            proportional: load("Ubuntu-Light"),
            monospace: load("Hack"),
        }
    }

    /// Use the font at `path` for proportional text
    pub fn from_file(path: &Path) -> EditorResult<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| EditorError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            proportional: Some(font),
            ..Self::bundled()
        })
    }

    pub fn from_config(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::from_file(path).unwrap_or_else(|err| {
                log::warn!("Falling back to bundled font: {}", err);
                Self::bundled()
            }),
            None => Self::bundled(),
        }
    }

    fn font_for(&self, family: &str) -> Option<&FontArc> {
        let family = family.to_ascii_lowercase();
        if family.contains("mono") || family == "hack" {
            self.monospace.as_ref().or(self.proportional.as_ref())
        } else {
            self.proportional.as_ref().or(self.monospace.as_ref())
        }
    }

    fn bold_offset(style: &TextStyle) -> f32 {
        if style.bold { (style.font_size / 24.0).max(1.0) } else { 0.0 }
    }

    pub fn line_height(&self, style: &TextStyle) -> f32 {
        match self.font_for(&style.font_family) {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(style.font_size));
                scaled.height() + scaled.line_gap()
            }
            None => style.font_size * 1.2,
        }
    }

    /// Advance width of a single line
    pub fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        let advance = match self.font_for(&style.font_family) {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(style.font_size));
                let mut width = 0.0;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                width
            }
            None => text.chars().count() as f32 * style.font_size * 0.5,
        };
        let italic = if style.italic { style.font_size * ITALIC_SHEAR } else { 0.0 };
        advance + Self::bold_offset(style) + italic
    }

    /// Re-measure every line and place it according to the alignment
    pub fn layout(&self, text: &mut TextObject) {
        let mut lines: Vec<TextLine> = text
            .content
            .split('\n')
            .map(|line| TextLine {
                text: line.to_owned(),
                offset_x: 0.0,
                width: self.measure(line, &text.style),
            })
            .collect();
        let block_width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
        for line in &mut lines {
            line.offset_x = match text.style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (block_width - line.width) / 2.0,
                TextAlign::Right => block_width - line.width,
            };
        }
        text.lines = lines;
        text.line_height = self.line_height(&text.style);
        text.width = block_width.max(1.0);
    }

    /// Rasterize a laid-out text block, including its stroke, shadow and underline
    pub(crate) fn rasterize(&self, text: &TextObject, resolution: f32) -> Option<LocalRaster> {
        let style = &text.style;
        let stroke_width = style.stroke.map(|s| s.width).unwrap_or(0.0);
        let shadow_reach = style
            .shadow
            .map(|s| s.offset.x.abs().max(s.offset.y.abs()) + s.blur * 3.0)
            .unwrap_or(0.0);
        let pad = stroke_width + shadow_reach + style.font_size * 0.25;

        let width = ((text.width + pad * 2.0) * resolution).ceil().clamp(1.0, super::MAX_RASTER_SIDE) as u32;
        let height = ((text.height() + pad * 2.0) * resolution).ceil().clamp(1.0, super::MAX_RASTER_SIDE) as u32;
        let mut coverage = Coverage::new(width, height);

        if let Some(font) = self.font_for(&style.font_family) {
            let px = style.font_size * resolution;
            let scaled = font.as_scaled(PxScale::from(px));
            let bold = Self::bold_offset(style) * resolution;
            for (row, line) in text.lines.iter().enumerate() {
                let baseline = (pad + row as f32 * text.line_height) * resolution + scaled.ascent();
                let mut x = (pad + line.offset_x) * resolution;
                let mut previous = None;
                for c in line.text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        x += scaled.kern(prev, id);
                    }
                    let passes = if style.bold { vec![0.0, bold] } else { vec![0.0] };
                    for dx in passes {
                        let glyph = id.with_scale_and_position(px, point(x + dx, baseline));
                        if let Some(outlined) = font.outline_glyph(glyph) {
                            let bounds = outlined.px_bounds();
                            outlined.draw(|gx, gy, c| {
                                let gy = bounds.min.y + gy as f32;
                                let shear = if style.italic { (baseline - gy) * ITALIC_SHEAR } else { 0.0 };
                                let gx = bounds.min.x + gx as f32 + shear;
                                coverage.add(gx as i32, gy as i32, c);
                            });
                        }
                    }
                    x += scaled.h_advance(id);
                    previous = Some(id);
                }
                if style.underline {
                    let thickness = (style.font_size / 15.0).max(1.0) * resolution;
                    let top = baseline + style.font_size * 0.1 * resolution;
                    let left = (pad + line.offset_x) * resolution;
                    coverage.fill_rect(left, top, line.width * resolution, thickness);
                }
            }
        }

        let mut pixels = vec![[0.0f32; 4]; (width * height) as usize];
        if let Some(shadow) = style.shadow {
            let layer = shadow_layer(&coverage, shadow.color, shadow.blur * resolution);
            let (ox, oy) = (
                (shadow.offset.x * resolution).round() as i32,
                (shadow.offset.y * resolution).round() as i32,
            );
            for (x, y, p) in layer.enumerate_pixels() {
                let (tx, ty) = (x as i32 + ox, y as i32 + oy);
                if tx >= 0 && ty >= 0 && (tx as u32) < width && (ty as u32) < height {
                    let i = (ty as u32 * width + tx as u32) as usize;
                    pixels[i] = over(pixels[i], unmultiplied_to_premul(p));
                }
            }
        }
        if let Some(stroke) = style.stroke {
            let radius = ((stroke.width * resolution).round() as i32).clamp(0, MAX_STROKE_RADIUS);
            let dilated = coverage.dilate(radius);
            let color = premultiplied(stroke.color);
            for (pixel, c) in pixels.iter_mut().zip(&dilated.values) {
                *pixel = over(*pixel, color.map(|v| v * c));
            }
        }
        let fill = premultiplied(style.color);
        for (pixel, c) in pixels.iter_mut().zip(&coverage.values) {
            *pixel = over(*pixel, fill.map(|v| v * c));
        }

        let image = RgbaImage::from_fn(width, height, |x, y| to_rgba(pixels[(y * width + x) as usize]));
        Some(LocalRaster {
            pixels: Arc::new(image),
            origin: Pos2::ZERO - egui::Vec2::splat(pad),
            resolution,
        })
    }
}

fn unmultiplied_to_premul(p: &Rgba<u8>) -> [f32; 4] {
    let a = p.0[3] as f32 / 255.0;
    [
        p.0[0] as f32 / 255.0 * a,
        p.0[1] as f32 / 255.0 * a,
        p.0[2] as f32 / 255.0 * a,
        a,
    ]
}

fn shadow_layer(coverage: &Coverage, color: Color32, blur: f32) -> RgbaImage {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let layer = RgbaImage::from_fn(coverage.width, coverage.height, |x, y| {
        let c = coverage.values[(y * coverage.width + x) as usize];
        Rgba([r, g, b, (a as f32 * c).round() as u8])
    });
    if blur >= 0.5 {
        image::imageops::blur(&layer, blur)
    } else {
        layer
    }
}

/// Glyph coverage in `0..=1` per raster pixel
struct Coverage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Coverage {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; (width * height) as usize],
        }
    }

    fn add(&mut self, x: i32, y: i32, c: f32) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = (y as u32 * self.width + x as u32) as usize;
        self.values[i] = self.values[i].max(c.clamp(0.0, 1.0));
    }

    fn fill_rect(&mut self, left: f32, top: f32, width: f32, height: f32) {
        let (x0, y0) = (left.floor() as i32, top.floor() as i32);
        let (x1, y1) = ((left + width).ceil() as i32, (top + height).ceil() as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                self.add(x, y, 1.0);
            }
        }
    }

    /// Grow covered areas by a disk of `radius` pixels
    fn dilate(&self, radius: i32) -> Coverage {
        let mut out = Coverage::new(self.width, self.height);
        if radius == 0 {
            out.values.clone_from(&self.values);
            return out;
        }
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let c = self.values[(y as u32 * self.width + x as u32) as usize];
                if c <= 0.0 {
                    continue;
                }
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx * dx + dy * dy <= radius * radius {
                            out.add(x + dx, y + dy, c);
                        }
                    }
                }
            }
        }
        out
    }
}
