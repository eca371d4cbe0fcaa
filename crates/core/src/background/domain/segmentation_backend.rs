use std::path::Path;

use super::remover_error::RemoverError;

/// Per-call knobs passed to a segmentation backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentationOptions {
    pub threshold: u8,
    pub preserve_elements: bool,
    pub smooth_edges: bool,
    pub verbose: bool,
}

/// Backend-specific diagnostics about how an image segments.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationStats {
    pub width: u32,
    pub height: u32,
    /// Share of pixels whose alpha is at or above the threshold.
    pub foreground_ratio: f64,
    pub mean_alpha: f64,
}

/// A local segmentation capability, e.g. an ONNX model session.
///
/// `process` returns `Ok(false)` when the backend ran but could not produce a
/// usable cut-out.
pub trait SegmentationBackend: Send {
    fn process(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        options: &SegmentationOptions,
    ) -> Result<bool, Box<dyn std::error::Error>>;

    fn stats(
        &mut self,
        _image_path: &Path,
        _threshold: u8,
    ) -> Result<Option<SegmentationStats>, Box<dyn std::error::Error>> {
        Ok(None)
    }
}

/// Builds segmentation backends by model identifier.
///
/// Loading fails with [`RemoverError::BackendUnavailable`] when the model or
/// runtime is missing, and [`RemoverError::Configuration`] for unknown names.
pub trait SegmentationLoader: Send + Sync {
    fn load(&self, model: &str) -> Result<Box<dyn SegmentationBackend>, RemoverError>;
}
