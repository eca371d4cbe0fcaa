/// Salient-object segmentation using ONNX Runtime via `ort`.
///
/// Runs the ISNet / U²-Net family of matting models: the image is resized to
/// the model resolution, the predicted saliency map is min-max normalized into
/// an 8-bit mask, scaled back to the source size and applied as alpha.
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma, RgbImage, RgbaImage};

use crate::background::domain::remover_error::RemoverError;
use crate::background::domain::segmentation_backend::{
    SegmentationBackend, SegmentationLoader, SegmentationOptions, SegmentationStats,
};
use crate::shared::constants::SEGMENTATION_MODEL_BASE_URL;
use crate::shared::model_resolver;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Alpha at or above which a hardened mask pixel becomes opaque.
const HARD_MASK_CUTOFF: u8 = 128;

const EDGE_SMOOTH_SIGMA: f32 = 1.0;

/// Input geometry and normalization of a known segmentation model.
#[derive(Debug, PartialEq)]
pub struct SegmentationModel {
    pub name: &'static str,
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

pub const KNOWN_MODELS: &[SegmentationModel] = &[
    SegmentationModel {
        name: "isnet-general-use",
        input_size: 1024,
        mean: [0.5, 0.5, 0.5],
        std: [1.0, 1.0, 1.0],
    },
    SegmentationModel {
        name: "u2net",
        input_size: 320,
        mean: IMAGENET_MEAN,
        std: IMAGENET_STD,
    },
    SegmentationModel {
        name: "u2net_human_seg",
        input_size: 320,
        mean: IMAGENET_MEAN,
        std: IMAGENET_STD,
    },
    SegmentationModel {
        name: "silueta",
        input_size: 320,
        mean: IMAGENET_MEAN,
        std: IMAGENET_STD,
    },
];

impl SegmentationModel {
    pub fn by_name(name: &str) -> Option<&'static SegmentationModel> {
        KNOWN_MODELS.iter().find(|m| m.name == name)
    }

    pub fn known_names() -> Vec<&'static str> {
        KNOWN_MODELS.iter().map(|m| m.name).collect()
    }

    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.name)
    }

    pub fn download_url(&self) -> String {
        format!("{SEGMENTATION_MODEL_BASE_URL}/{}", self.file_name())
    }
}

/// Segmentation backend backed by an ONNX Runtime session.
pub struct OnnxSegmentationBackend {
    session: ort::session::Session,
    model: &'static SegmentationModel,
}

impl OnnxSegmentationBackend {
    pub fn new(
        model_path: &Path,
        model: &'static SegmentationModel,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self { session, model })
    }

    /// Predicts an alpha mask with the same dimensions as `image`.
    fn predict_mask(&mut self, image: &RgbImage) -> Result<GrayImage, Box<dyn std::error::Error>> {
        let size = self.model.input_size;
        let input_tensor = preprocess(image, self.model);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Matting models emit [1, 1, S, S] (ISNet/U²-Net emit several side
        // outputs; the first is the fused prediction).
        let prediction = outputs[0].try_extract_array::<f32>()?;
        let data = prediction.as_slice().ok_or("Cannot get mask slice")?;
        let plane = (size * size) as usize;
        if data.len() < plane {
            return Err(format!(
                "{} produced {} mask values, expected at least {plane}",
                self.model.name,
                data.len()
            )
            .into());
        }

        let mask = normalize_mask(&data[..plane], size, size);
        Ok(imageops::resize(
            &mask,
            image.width(),
            image.height(),
            FilterType::Lanczos3,
        ))
    }
}

impl SegmentationBackend for OnnxSegmentationBackend {
    fn process(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        options: &SegmentationOptions,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let source = image::open(input_path)?;
        let mask = self.predict_mask(&source.to_rgb8())?;
        let cutout = apply_mask(&source.to_rgba8(), &mask, options);

        if cutout.pixels().all(|p| p[3] == 0) {
            log::warn!(
                "{}: no foreground found in {}",
                self.model.name,
                input_path.display()
            );
            return Ok(false);
        }

        cutout.save_with_format(output_path, ImageFormat::Png)?;
        if options.verbose {
            log::info!(
                "{}: {} -> {}",
                self.model.name,
                input_path.display(),
                output_path.display()
            );
        }
        Ok(true)
    }

    fn stats(
        &mut self,
        image_path: &Path,
        threshold: u8,
    ) -> Result<Option<SegmentationStats>, Box<dyn std::error::Error>> {
        let source = image::open(image_path)?.to_rgb8();
        let mask = self.predict_mask(&source)?;
        Ok(Some(mask_stats(&mask, threshold)))
    }
}

/// Loads [`OnnxSegmentationBackend`]s from the model cache or a bundled directory.
pub struct OnnxSegmentationLoader {
    models_dir: Option<PathBuf>,
}

impl OnnxSegmentationLoader {
    pub fn new(models_dir: Option<PathBuf>) -> Self {
        Self { models_dir }
    }

    /// Returns a loader only if at least one known model is installed.
    pub fn probe(models_dir: Option<PathBuf>) -> Option<Self> {
        let loader = Self::new(models_dir);
        let installed = loader.installed_models();
        if installed.is_empty() {
            log::debug!("No segmentation models installed");
            None
        } else {
            log::debug!("Installed segmentation models: {}", installed.join(", "));
            Some(loader)
        }
    }

    pub fn installed_models(&self) -> Vec<&'static str> {
        KNOWN_MODELS
            .iter()
            .filter(|m| model_resolver::resolve(&m.file_name(), self.models_dir.as_deref()).is_ok())
            .map(|m| m.name)
            .collect()
    }
}

impl SegmentationLoader for OnnxSegmentationLoader {
    fn load(&self, model: &str) -> Result<Box<dyn SegmentationBackend>, RemoverError> {
        let spec = SegmentationModel::by_name(model).ok_or_else(|| {
            RemoverError::configuration(format!(
                "unknown segmentation model '{model}', known: {}",
                SegmentationModel::known_names().join(", ")
            ))
        })?;
        let path = model_resolver::resolve(&spec.file_name(), self.models_dir.as_deref())
            .map_err(|e| RemoverError::unavailable(e.to_string()))?;
        let backend = OnnxSegmentationBackend::new(&path, spec).map_err(|e| {
            RemoverError::unavailable(format!("failed to load {}: {e}", path.display()))
        })?;
        Ok(Box::new(backend))
    }
}

// ---------------------------------------------------------------------------
// Pre/post-processing
// ---------------------------------------------------------------------------

/// Resize to the model resolution and normalize to NCHW float32.
fn preprocess(image: &RgbImage, model: &SegmentationModel) -> ndarray::Array4<f32> {
    let s = model.input_size;
    let resized = imageops::resize(image, s, s, FilterType::Lanczos3);
    let s = s as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = f32::from(pixel[c]) / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - model.mean[c]) / model.std[c];
        }
    }
    tensor
}

/// Min-max normalize raw predictions into an 8-bit mask.
///
/// A flat prediction carries no foreground and yields an all-zero mask.
fn normalize_mask(values: &[f32], width: u32, height: u32) -> GrayImage {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    GrayImage::from_fn(width, height, |x, y| {
        if range <= f32::EPSILON {
            return Luma([0]);
        }
        let v = values[(y * width + x) as usize];
        Luma([(((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8])
    })
}

/// Apply a mask as alpha, honoring the threshold and element/edge options.
///
/// Alpha below `threshold` is cleared. Without `preserve_elements` the
/// surviving alpha is hardened to fully opaque or fully transparent. The
/// source alpha is multiplied in, so already-transparent pixels stay so.
fn apply_mask(image: &RgbaImage, mask: &GrayImage, options: &SegmentationOptions) -> RgbaImage {
    let mask = if options.smooth_edges {
        imageops::blur(mask, EDGE_SMOOTH_SIGMA)
    } else {
        mask.clone()
    };

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let mut alpha = mask.get_pixel(x, y)[0];
        if alpha < options.threshold {
            alpha = 0;
        } else if !options.preserve_elements {
            alpha = if alpha >= HARD_MASK_CUTOFF { 255 } else { 0 };
        }
        pixel[3] = ((u16::from(alpha) * u16::from(pixel[3])) / 255) as u8;
    }
    out
}

fn mask_stats(mask: &GrayImage, threshold: u8) -> SegmentationStats {
    let total = (mask.width() as usize * mask.height() as usize).max(1);
    let foreground = mask.pixels().filter(|p| p[0] >= threshold).count();
    let sum: u64 = mask.pixels().map(|p| u64::from(p[0])).sum();
    SegmentationStats {
        width: mask.width(),
        height: mask.height(),
        foreground_ratio: foreground as f64 / total as f64,
        mean_alpha: sum as f64 / total as f64,
    }
}
