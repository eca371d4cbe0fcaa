/// ResNet-10 SSD face detector using ONNX Runtime via `ort`.
///
/// Runs the `res10_300x300_ssd_iter_140000` network: a single 300×300 BGR
/// input blob with per-channel mean subtraction, and a `[1, 1, N, 7]` output
/// of `[image_id, label, confidence, x1, y1, x2, y2]` rows.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::detection::domain::face_detector::{Detection, FaceDetector};
use crate::shared::constants::FACE_MODEL_NAME;
use crate::shared::model_resolver;

/// Network input resolution.
const INPUT_SIZE: u32 = 300;

/// Per-channel means in blob (BGR) order.
const MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];

/// Values per output row.
const ROW_LEN: usize = 7;

/// SSD face detector backed by an ONNX Runtime session.
pub struct OnnxSsdDetector {
    session: ort::session::Session,
}

impl OnnxSsdDetector {
    /// Load the SSD face model from `model_path`.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        log::debug!("Loaded face detector from {}", model_path.display());
        Ok(Self { session })
    }

    /// Resolve the face model through the model cache and the optional
    /// bundled directory, then load it.
    pub fn from_models_dir(models_dir: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = model_resolver::resolve(FACE_MODEL_NAME, models_dir)?;
        Self::new(&path)
    }
}

impl FaceDetector for OnnxSsdDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(image);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let raw = outputs[0].try_extract_array::<f32>()?;
        let data = raw.as_slice().ok_or("Cannot get detection slice")?;
        parse_detections(data)
    }
}

// ---------------------------------------------------------------------------
// Pre/post-processing
// ---------------------------------------------------------------------------

/// Resize to 300×300, reorder to BGR, subtract the channel means, NCHW f32.
fn preprocess(image: &RgbImage) -> ndarray::Array4<f32> {
    let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let s = INPUT_SIZE as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let bgr = [pixel[2], pixel[1], pixel[0]];
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = f32::from(bgr[c]) - MEAN_BGR[c];
        }
    }
    tensor
}

/// Decode `[image_id, label, confidence, x1, y1, x2, y2]` rows, keeping the
/// network's order.
fn parse_detections(data: &[f32]) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
    if data.len() % ROW_LEN != 0 {
        return Err(format!(
            "SSD output has {} values, not a multiple of {ROW_LEN}",
            data.len()
        )
        .into());
    }

    Ok(data
        .chunks_exact(ROW_LEN)
        .map(|row| Detection {
            confidence: row[2],
            x1: row[3],
            y1: row[4],
            x2: row[5],
            y2: row[6],
        })
        .collect())
}
