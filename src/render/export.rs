use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::EditorResult;

/// Pixel encodings the document can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Png,
        ExportFormat::Jpeg,
        ExportFormat::WebP,
        ExportFormat::Bmp,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
            ExportFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::WebP => "image/webp",
            ExportFormat::Bmp => "image/bmp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Jpeg => "JPEG",
            ExportFormat::WebP => "WebP",
            ExportFormat::Bmp => "BMP",
        }
    }
}

/// Encode `pixels` as `format`. JPEG has no alpha, so it is flattened onto white.
pub fn encode(pixels: &RgbaImage, format: ExportFormat, jpeg_quality: u8) -> EditorResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ExportFormat::Png => pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?,
        ExportFormat::WebP => pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)?,
        ExportFormat::Bmp => pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)?,
        ExportFormat::Jpeg => {
            let flattened = flatten_on_white(pixels);
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100)).encode_image(&flattened)?;
        }
    }
    log::debug!("Encoded {}x{} as {} ({} bytes)", pixels.width(), pixels.height(), format.label(), bytes.len());
    Ok(bytes)
}

fn flatten_on_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
