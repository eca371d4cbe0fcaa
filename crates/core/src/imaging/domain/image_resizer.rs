use image::RgbaImage;

/// Scales an image to fit inside a bounding box.
pub trait ImageResizer: Send {
    fn resize(&self, image: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage;
}
