use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::imaging::domain::image_resizer::ImageResizer;

/// Fits images inside a bounding box, preserving aspect ratio.
///
/// Images that already fit are returned unchanged; nothing is upscaled.
/// Dimensions are floored and never drop below 1.
pub struct ProportionalResizer {
    filter: FilterType,
}

impl ProportionalResizer {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Target dimensions for an image of `width × height`.
    pub fn fitted_dimensions(
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    ) -> (u32, u32) {
        if width <= max_width && height <= max_height {
            return (width, height);
        }

        let aspect = f64::from(width) / f64::from(height);
        let target_aspect = f64::from(max_width) / f64::from(max_height);
        let (w, h) = if aspect > target_aspect {
            (max_width, (f64::from(max_width) / aspect).floor() as u32)
        } else {
            ((f64::from(max_height) * aspect).floor() as u32, max_height)
        };
        (w.max(1), h.max(1))
    }
}

impl Default for ProportionalResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageResizer for ProportionalResizer {
    fn resize(&self, image: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
        let (width, height) = image.dimensions();
        let (w, h) = Self::fitted_dimensions(width, height, max_width, max_height);
        if (w, h) == (width, height) {
            return image.clone();
        }
        log::debug!("Resizing {width}x{height} -> {w}x{h}");
        imageops::resize(image, w, h, self.filter)
    }
}
