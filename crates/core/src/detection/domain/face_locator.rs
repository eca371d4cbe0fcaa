use image::{imageops, DynamicImage, RgbaImage};

use super::face_detector::{Detection, FaceDetector};
use crate::shared::face_rect::FaceRect;

/// Minimum confidence for the top-of-image pass.
pub const TOP_REGION_THRESHOLD: f32 = 0.3;

/// Minimum confidence for the full-image pass.
pub const FULL_IMAGE_THRESHOLD: f32 = 0.2;

/// Finds a fixed-size crop rectangle centered on a detected face.
///
/// The detector is loaded once and reused across calls.
pub struct FaceLocator {
    detector: Box<dyn FaceDetector>,
}

impl FaceLocator {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Searches `image` for a face and returns a `target` sized rectangle
    /// centered on it, clamped inside the image.
    ///
    /// With `search_top_only` the search covers the top 40% of the image at
    /// threshold 0.3; otherwise the whole image at 0.2. The first detection
    /// strictly above the threshold wins.
    pub fn locate(
        &mut self,
        image: &RgbaImage,
        target: (u32, u32),
        search_top_only: bool,
    ) -> Result<Option<FaceRect>, Box<dyn std::error::Error>> {
        let (width, height) = image.dimensions();
        let (search_height, threshold) = if search_top_only {
            (top_region_height(height), TOP_REGION_THRESHOLD)
        } else {
            (height, FULL_IMAGE_THRESHOLD)
        };
        if width == 0 || search_height == 0 {
            log::debug!("Empty search region for {width}x{height} image");
            return Ok(None);
        }

        let region = imageops::crop_imm(image, 0, 0, width, search_height).to_image();
        let rgb = DynamicImage::ImageRgba8(region).into_rgb8();
        let detections = self.detector.detect(&rgb)?;

        let Some(face) = first_above(&detections, threshold) else {
            log::debug!(
                "No face above {threshold} in {} search ({} candidates)",
                if search_top_only { "top-region" } else { "full-image" },
                detections.len()
            );
            return Ok(None);
        };

        let x1 = (face.x1 * width as f32) as i64;
        let y1 = (face.y1 * search_height as f32) as i64;
        let x2 = (face.x2 * width as f32) as i64;
        let y2 = (face.y2 * search_height as f32) as i64;
        let center_x = (x1 + x2).div_euclid(2);
        let center_y = (y1 + y2).div_euclid(2);

        let rect = FaceRect::centered_on(center_x, center_y, target.0, target.1, width, height);
        log::debug!(
            "Face at ({center_x}, {center_y}) with confidence {:.2}, crop {rect:?}",
            face.confidence
        );
        Ok(Some(rect))
    }

    /// Top-region search first, then the full image if nothing was found.
    pub fn locate_optimized(
        &mut self,
        image: &RgbaImage,
        target: (u32, u32),
    ) -> Result<Option<FaceRect>, Box<dyn std::error::Error>> {
        if let Some(rect) = self.locate(image, target, true)? {
            return Ok(Some(rect));
        }
        self.locate(image, target, false)
    }
}

/// `floor(height * 0.4)`.
fn top_region_height(height: u32) -> u32 {
    (u64::from(height) * 2 / 5) as u32
}

fn first_above(detections: &[Detection], threshold: f32) -> Option<&Detection> {
    detections.iter().find(|d| d.confidence > threshold)
}
