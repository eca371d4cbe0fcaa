use image::RgbImage;

/// One candidate face reported by a detector.
///
/// Coordinates are normalized to `[0, 1]` relative to the image passed to
/// [`FaceDetector::detect`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Domain interface for face detection.
///
/// Detections come back in the order the backend emits them; callers rely
/// on that order.
pub trait FaceDetector: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
