use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

use crate::imaging::domain::image_writer::ImageWriter;

/// Writes RGBA images as PNG files using the `image` crate.
///
/// A requested size is applied exactly, without preserving aspect ratio.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        image: &RgbaImage,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match size {
            Some((w, h)) if (w, h) != image.dimensions() => {
                imageops::resize(image, w, h, FilterType::CatmullRom)
                    .save_with_format(path, ImageFormat::Png)?;
            }
            _ => image.save_with_format(path, ImageFormat::Png)?,
        }
        Ok(())
    }
}
