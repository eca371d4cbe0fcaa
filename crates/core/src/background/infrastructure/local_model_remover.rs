use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::background::domain::background_remover::BackgroundRemover;
use crate::background::domain::remover_config::BackgroundRemoverConfig;
use crate::background::domain::remover_error::RemoverError;
use crate::background::domain::segmentation_backend::{
    SegmentationBackend, SegmentationLoader, SegmentationOptions, SegmentationStats,
};

/// Background remover that delegates to a local segmentation model.
///
/// The backend is loaded eagerly so a missing model surfaces at construction
/// as [`RemoverError::BackendUnavailable`].
pub struct LocalModelRemover {
    loader: Arc<dyn SegmentationLoader>,
    backend: Box<dyn SegmentationBackend>,
    config: BackgroundRemoverConfig,
}

impl LocalModelRemover {
    pub fn new(
        loader: Arc<dyn SegmentationLoader>,
        config: BackgroundRemoverConfig,
    ) -> Result<Self, RemoverError> {
        let backend = loader.load(&config.model)?;
        log::info!("Initialized local segmentation backend with model {}", config.model);
        Ok(Self {
            loader,
            backend,
            config,
        })
    }

    pub fn config(&self) -> &BackgroundRemoverConfig {
        &self.config
    }

    /// Updates the alpha threshold; valid values are 0-255.
    pub fn set_threshold(&mut self, threshold: i32) -> Result<(), RemoverError> {
        let threshold = u8::try_from(threshold).map_err(|_| {
            RemoverError::configuration(format!(
                "threshold must be between 0 and 255, got {threshold}"
            ))
        })?;
        self.config.alpha_threshold = threshold;
        log::debug!("Alpha threshold set to {threshold}");
        Ok(())
    }

    /// Switches to another model, reloading the backend.
    ///
    /// On failure the previous model stays active.
    pub fn set_model(&mut self, model: &str) -> Result<(), RemoverError> {
        log::info!("Switching segmentation model to {model}");
        self.backend = self.loader.load(model)?;
        self.config.model = model.to_string();
        Ok(())
    }

    /// Backend diagnostics for an image, or `None` when the backend has none
    /// or they could not be computed.
    pub fn get_stats(&mut self, image_path: &Path) -> Option<SegmentationStats> {
        match self.backend.stats(image_path, self.config.alpha_threshold) {
            Ok(stats) => {
                if stats.is_none() {
                    log::info!("Statistics not supported by model {}", self.config.model);
                }
                stats
            }
            Err(e) => {
                log::warn!("Failed to compute statistics for {}: {e}", image_path.display());
                None
            }
        }
    }

    fn options(&self) -> SegmentationOptions {
        SegmentationOptions {
            threshold: self.config.alpha_threshold,
            preserve_elements: self.config.preserve_elements,
            smooth_edges: self.config.smooth_edges,
            verbose: log::log_enabled!(log::Level::Debug),
        }
    }
}

impl BackgroundRemover for LocalModelRemover {
    fn remove_background(&mut self, input_path: &Path, output_path: &Path) -> Result<(), RemoverError> {
        if !input_path.is_file() {
            return Err(RemoverError::InputNotFound(input_path.to_path_buf()));
        }
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RemoverError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let options = self.options();
        let processing_err = |reason: String| RemoverError::Processing {
            path: input_path.to_path_buf(),
            reason,
        };
        let success = self
            .backend
            .process(input_path, output_path, &options)
            .map_err(|e| processing_err(e.to_string()))?;
        if !success {
            return Err(processing_err(format!(
                "model {} produced no foreground",
                self.config.model
            )));
        }

        log::debug!("Background removed: {}", output_path.display());
        Ok(())
    }
}

impl fmt::Display for LocalModelRemover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LocalModelRemover(model={}, threshold={})",
            self.config.model, self.config.alpha_threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // --- Stubs ---

    struct StubBackend {
        succeed: bool,
        calls: Arc<Mutex<Vec<SegmentationOptions>>>,
        stats: Option<SegmentationStats>,
    }

    impl SegmentationBackend for StubBackend {
        fn process(
            &mut self,
            input_path: &Path,
            output_path: &Path,
            options: &SegmentationOptions,
        ) -> Result<bool, Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push(*options);
            if self.succeed {
                fs::copy(input_path, output_path)?;
            }
            Ok(self.succeed)
        }

        fn stats(
            &mut self,
            _image_path: &Path,
            _threshold: u8,
        ) -> Result<Option<SegmentationStats>, Box<dyn std::error::Error>> {
            Ok(self.stats.clone())
        }
    }

    struct StubLoader {
        succeed: bool,
        known: Vec<&'static str>,
        loaded: Arc<Mutex<Vec<String>>>,
        calls: Arc<Mutex<Vec<SegmentationOptions>>>,
        stats: Option<SegmentationStats>,
    }

    impl StubLoader {
        fn new(succeed: bool) -> Self {
            Self {
                succeed,
                known: vec!["isnet-general-use", "u2net"],
                loaded: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(Mutex::new(Vec::new())),
                stats: None,
            }
        }
    }

    impl SegmentationLoader for StubLoader {
        fn load(&self, model: &str) -> Result<Box<dyn SegmentationBackend>, RemoverError> {
            if !self.known.contains(&model) {
                return Err(RemoverError::unavailable(format!("model {model} not installed")));
            }
            self.loaded.lock().unwrap().push(model.to_string());
            Ok(Box::new(StubBackend {
                succeed: self.succeed,
                calls: self.calls.clone(),
                stats: self.stats.clone(),
            }))
        }
    }

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("in.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();
        path
    }

    // --- Tests ---

    #[test]
    fn test_construction_loads_configured_model() {
        let loader = StubLoader::new(true);
        let loaded = loader.loaded.clone();
        let remover = LocalModelRemover::new(Arc::new(loader), BackgroundRemoverConfig::default());
        assert!(remover.is_ok());
        assert_eq!(*loaded.lock().unwrap(), vec!["isnet-general-use".to_string()]);
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let config = BackgroundRemoverConfig {
            model: "silueta".into(),
            ..Default::default()
        };
        let err = LocalModelRemover::new(Arc::new(StubLoader::new(true)), config)
            .err()
            .unwrap();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_remove_background_passes_config_to_backend() {
        let loader = StubLoader::new(true);
        let calls = loader.calls.clone();
        let config = BackgroundRemoverConfig {
            alpha_threshold: 42,
            preserve_elements: false,
            smooth_edges: true,
            ..Default::default()
        };
        let mut remover = LocalModelRemover::new(Arc::new(loader), config).unwrap();

        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("nested").join("out.png");
        remover.remove_background(&input, &output).unwrap();

        assert!(output.exists());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].threshold, 42);
        assert!(!calls[0].preserve_elements);
        assert!(calls[0].smooth_edges);
    }

    #[test]
    fn test_backend_failure_is_processing_error() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(false)), Default::default()).unwrap();
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let err = remover
            .remove_background(&input, &tmp.path().join("out.png"))
            .unwrap_err();
        assert!(matches!(err, RemoverError::Processing { .. }));
    }

    #[test]
    fn test_missing_input_is_reported() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        let tmp = TempDir::new().unwrap();
        let err = remover
            .remove_background(&tmp.path().join("missing.png"), &tmp.path().join("out.png"))
            .unwrap_err();
        assert!(matches!(err, RemoverError::InputNotFound(_)));
    }

    #[test]
    fn test_set_threshold_accepts_range_bounds() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        remover.set_threshold(0).unwrap();
        assert_eq!(remover.config().alpha_threshold, 0);
        remover.set_threshold(255).unwrap();
        assert_eq!(remover.config().alpha_threshold, 255);
    }

    #[test]
    fn test_set_threshold_rejects_out_of_range() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        assert!(remover.set_threshold(256).unwrap_err().is_configuration());
        assert!(remover.set_threshold(-1).unwrap_err().is_configuration());
        assert_eq!(remover.config().alpha_threshold, 20);
    }

    #[test]
    fn test_set_model_reloads_backend() {
        let loader = StubLoader::new(true);
        let loaded = loader.loaded.clone();
        let mut remover = LocalModelRemover::new(Arc::new(loader), Default::default()).unwrap();

        remover.set_model("u2net").unwrap();

        assert_eq!(remover.config().model, "u2net");
        assert_eq!(loaded.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_set_model_failure_keeps_previous_model() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        assert!(remover.set_model("silueta").is_err());
        assert_eq!(remover.config().model, "isnet-general-use");
    }

    #[test]
    fn test_get_stats_none_when_unsupported() {
        let mut remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        assert!(remover.get_stats(Path::new("whatever.png")).is_none());
    }

    #[test]
    fn test_get_stats_returns_backend_stats() {
        let mut loader = StubLoader::new(true);
        let stats = SegmentationStats {
            width: 10,
            height: 20,
            foreground_ratio: 0.5,
            mean_alpha: 127.0,
        };
        loader.stats = Some(stats.clone());
        let mut remover = LocalModelRemover::new(Arc::new(loader), Default::default()).unwrap();
        assert_eq!(remover.get_stats(Path::new("whatever.png")), Some(stats));
    }

    #[test]
    fn test_display() {
        let remover =
            LocalModelRemover::new(Arc::new(StubLoader::new(true)), Default::default()).unwrap();
        assert_eq!(
            remover.to_string(),
            "LocalModelRemover(model=isnet-general-use, threshold=20)"
        );
    }
}
