use std::path::Path;

use image::RgbaImage;

/// Writes a single RGBA image to a file.
pub trait ImageWriter: Send {
    /// Writes `image` to `path`, force-resizing to `size` when given.
    fn write(
        &self,
        path: &Path,
        image: &RgbaImage,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
