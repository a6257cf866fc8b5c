use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;

use crate::document::{ImageFilters, SourceId};

/// Largest blur radius as a share of the image's longer side
const MAX_BLUR_FRACTION: f32 = 0.02;

/// Keep at most this many filtered buffers around
const FILTER_CACHE_CAPACITY: usize = 16;

/// Apply `filters` to `source`, returning a new buffer
pub fn apply_filters(source: &RgbaImage, filters: &ImageFilters) -> RgbaImage {
    let mut output = source.clone();
    let brightness = filters.brightness.clamp(-1.0, 1.0) * 255.0;
    let contrast = filters.contrast.clamp(-1.0, 1.0);
    let saturation = filters.saturation.clamp(-1.0, 1.0);

    for pixel in output.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let mut channels = [r as f32, g as f32, b as f32];

        if brightness != 0.0 {
            for ch in channels.iter_mut() {
                *ch += brightness;
            }
        }
        if contrast != 0.0 {
            for ch in channels.iter_mut() {
                *ch = (*ch - 128.0) * (1.0 + contrast) + 128.0;
            }
        }
        if saturation != 0.0 {
            let max = channels.iter().cloned().fold(f32::MIN, f32::max);
            let adjust = -saturation;
            for ch in channels.iter_mut() {
                if *ch != max {
                    *ch += (max - *ch) * adjust;
                }
            }
        }
        if filters.grayscale {
            let luma = channels[0] * 0.299 + channels[1] * 0.587 + channels[2] * 0.114;
            channels = [luma; 3];
        }
        if filters.sepia {
            let [r, g, b] = channels;
            channels = [
                r * 0.393 + g * 0.769 + b * 0.189,
                r * 0.349 + g * 0.686 + b * 0.168,
                r * 0.272 + g * 0.534 + b * 0.131,
            ];
        }
        if filters.invert {
            for ch in channels.iter_mut() {
                *ch = 255.0 - ch.clamp(0.0, 255.0);
            }
        }

        let [r, g, b] = channels.map(|ch| ch.clamp(0.0, 255.0).round() as u8);
        *pixel = Rgba([r, g, b, a]);
    }

    if filters.blur > 0.0 {
        let longest = output.width().max(output.height()) as f32;
        let sigma = filters.blur.clamp(0.0, 1.0) * longest * MAX_BLUR_FRACTION;
        if sigma >= 0.5 {
            output = image::imageops::blur(&output, sigma);
        }
    }
    output
}

/// Filtered pixels keyed by source and filter settings
#[derive(Default)]
pub struct FilterCache {
    entries: HashMap<(SourceId, [u32; 5]), Arc<RgbaImage>>,
}

impl FilterCache {
    pub fn get_or_apply(
        &mut self,
        id: SourceId,
        source: &Arc<RgbaImage>,
        filters: &ImageFilters,
    ) -> Arc<RgbaImage> {
        if filters.is_identity() {
            return Arc::clone(source);
        }
        let key = (id, filters.cache_key());
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit);
        }
        if self.entries.len() >= FILTER_CACHE_CAPACITY {
            self.entries.clear();
        }
        let filtered = Arc::new(apply_filters(source, filters));
        self.entries.insert(key, Arc::clone(&filtered));
        filtered
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
