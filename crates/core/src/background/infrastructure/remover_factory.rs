use std::path::PathBuf;
use std::sync::Arc;

use crate::background::domain::background_remover::BackgroundRemover;
use crate::background::domain::remover_config::{BackgroundRemoverConfig, RemoverType};
use crate::background::domain::remover_error::RemoverError;
use crate::background::domain::segmentation_backend::SegmentationLoader;

use super::local_model_remover::LocalModelRemover;
use super::onnx_segmentation_backend::OnnxSegmentationLoader;
use super::remote_api_remover::RemoteApiRemover;

/// Chooses and builds background removers.
///
/// Local-model availability is probed once, when the selector is built, and
/// kept as plain data: a selector without a loader never offers
/// [`RemoverType::LocalModel`].
pub struct BackgroundRemoverSelector {
    local_loader: Option<Arc<dyn SegmentationLoader>>,
    api_endpoint: Option<String>,
}

impl BackgroundRemoverSelector {
    pub fn new(local_loader: Option<Arc<dyn SegmentationLoader>>) -> Self {
        Self {
            local_loader,
            api_endpoint: None,
        }
    }

    /// Probes for installed ONNX segmentation models in the model cache and
    /// the optional bundled directory.
    pub fn detect(models_dir: Option<PathBuf>) -> Self {
        let loader = OnnxSegmentationLoader::probe(models_dir)
            .map(|l| Arc::new(l) as Arc<dyn SegmentationLoader>);
        if loader.is_some() {
            log::info!("Local segmentation backend available");
        } else {
            log::info!("No local segmentation model installed; only the remote API is available");
        }
        Self::new(loader)
    }

    /// Overrides the endpoint used by API removers.
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn is_local_model_available(&self) -> bool {
        self.local_loader.is_some()
    }

    /// Remover types usable in this process, most preferred last.
    pub fn list_available_types(&self) -> Vec<RemoverType> {
        let mut types = vec![RemoverType::Api];
        if self.is_local_model_available() {
            types.push(RemoverType::LocalModel);
        }
        types
    }

    pub fn create(
        &self,
        remover_type: RemoverType,
        api_key: Option<&str>,
        config: &BackgroundRemoverConfig,
    ) -> Result<Box<dyn BackgroundRemover>, RemoverError> {
        match remover_type {
            RemoverType::Api => Ok(Box::new(self.create_api(api_key)?)),
            RemoverType::LocalModel => Ok(Box::new(self.create_local(config)?)),
        }
    }

    /// Like [`create`](Self::create), parsing the type from its name.
    pub fn create_by_name(
        &self,
        name: &str,
        api_key: Option<&str>,
        config: &BackgroundRemoverConfig,
    ) -> Result<Box<dyn BackgroundRemover>, RemoverError> {
        let remover_type = name.parse::<RemoverType>().map_err(|_| {
            let available: Vec<_> = self
                .list_available_types()
                .iter()
                .map(|t| t.as_str())
                .collect();
            RemoverError::configuration(format!(
                "invalid remover type '{name}', available: {}",
                available.join(", ")
            ))
        })?;
        self.create(remover_type, api_key, config)
    }

    pub fn create_api(&self, api_key: Option<&str>) -> Result<RemoteApiRemover, RemoverError> {
        let key = api_key.ok_or_else(|| {
            RemoverError::configuration("an API key is required for the api remover")
        })?;
        let remover = RemoteApiRemover::new(key)?;
        log::info!("Using remote API background remover");
        Ok(match &self.api_endpoint {
            Some(endpoint) => remover.with_endpoint(endpoint.clone()),
            None => remover,
        })
    }

    pub fn create_local(
        &self,
        config: &BackgroundRemoverConfig,
    ) -> Result<LocalModelRemover, RemoverError> {
        let loader = self.local_loader.clone().ok_or_else(|| {
            RemoverError::unavailable(
                "no local segmentation model installed (see `avatar-cutter fetch-model`)",
            )
        })?;
        let remover = LocalModelRemover::new(loader, config.clone())?;
        log::info!("Using {remover}");
        Ok(remover)
    }

    /// Prefers the local model, falls back to the API when a key is given.
    pub fn best_available(
        &self,
        api_key: Option<&str>,
        config: &BackgroundRemoverConfig,
    ) -> Result<Box<dyn BackgroundRemover>, RemoverError> {
        if self.is_local_model_available() {
            return self.create(RemoverType::LocalModel, api_key, config);
        }
        match api_key {
            Some(key) if !key.trim().is_empty() => self.create(RemoverType::Api, Some(key), config),
            _ => Err(RemoverError::NoneAvailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::domain::segmentation_backend::{
        SegmentationBackend, SegmentationOptions,
    };
    use std::path::Path;
    use std::sync::Mutex;

    struct AlwaysLoads;

    struct NoopBackend;

    impl SegmentationBackend for NoopBackend {
        fn process(
            &mut self,
            _input_path: &Path,
            _output_path: &Path,
            _options: &SegmentationOptions,
        ) -> Result<bool, Box<dyn std::error::Error>> {
            Ok(true)
        }
    }

    impl SegmentationLoader for AlwaysLoads {
        fn load(&self, _model: &str) -> Result<Box<dyn SegmentationBackend>, RemoverError> {
            Ok(Box::new(NoopBackend))
        }
    }

    /// Records every model it is asked to load.
    struct RecordingLoader {
        loads: Arc<Mutex<Vec<String>>>,
    }

    impl SegmentationLoader for RecordingLoader {
        fn load(&self, model: &str) -> Result<Box<dyn SegmentationBackend>, RemoverError> {
            self.loads.lock().unwrap().push(model.to_string());
            Ok(Box::new(NoopBackend))
        }
    }

    fn with_local() -> BackgroundRemoverSelector {
        BackgroundRemoverSelector::new(Some(Arc::new(AlwaysLoads)))
    }

    fn without_local() -> BackgroundRemoverSelector {
        BackgroundRemoverSelector::new(None)
    }

    #[test]
    fn test_api_without_key_is_configuration_error() {
        let err = without_local()
            .create(RemoverType::Api, None, &Default::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_api_with_key_builds_remover() {
        let remover = without_local().create(RemoverType::Api, Some("key"), &Default::default());
        assert!(remover.is_ok());
    }

    #[test]
    fn test_api_endpoint_override_is_applied() {
        let selector = without_local().with_api_endpoint("http://localhost:1234/removebg");
        let remover = selector.create_api(Some("key")).unwrap();
        assert_eq!(remover.endpoint(), "http://localhost:1234/removebg");
    }

    #[test]
    fn test_local_without_backend_is_unavailable_not_configuration() {
        let err = without_local()
            .create(RemoverType::LocalModel, None, &Default::default())
            .err()
            .unwrap();
        assert!(err.is_unavailable());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_local_with_backend_builds_remover() {
        let remover = with_local().create_local(&Default::default()).unwrap();
        assert_eq!(remover.config().model, "isnet-general-use");
    }

    #[test]
    fn test_available_types_reflect_probe() {
        assert_eq!(without_local().list_available_types(), vec![RemoverType::Api]);
        assert_eq!(
            with_local().list_available_types(),
            vec![RemoverType::Api, RemoverType::LocalModel]
        );
    }

    #[test]
    fn test_create_by_name_rejects_unknown_type() {
        let err = with_local()
            .create_by_name("tutorial", None, &Default::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("local-model"));
    }

    #[test]
    fn test_create_by_name_builds_api() {
        assert!(without_local()
            .create_by_name("api", Some("key"), &Default::default())
            .is_ok());
    }

    #[test]
    fn test_best_available_prefers_local() {
        let loads = Arc::new(Mutex::new(Vec::new()));
        let selector = BackgroundRemoverSelector::new(Some(Arc::new(RecordingLoader {
            loads: loads.clone(),
        })))
        .with_api_endpoint("http://invalid.nonexistent.example.com/removebg");

        assert!(selector.best_available(Some("key"), &Default::default()).is_ok());
        assert_eq!(*loads.lock().unwrap(), vec!["isnet-general-use".to_string()]);

        assert!(selector.best_available(None, &Default::default()).is_ok());
        assert_eq!(loads.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_best_available_falls_back_to_api() {
        assert!(without_local()
            .best_available(Some("key"), &Default::default())
            .is_ok());
    }

    #[test]
    fn test_best_available_without_anything_fails() {
        let err = without_local()
            .best_available(None, &Default::default())
            .err()
            .unwrap();
        assert!(matches!(err, RemoverError::NoneAvailable));
    }

    #[test]
    fn test_caller_can_fall_back_on_unavailable() {
        let selector = without_local();
        let config = BackgroundRemoverConfig::default();
        let remover = match selector.create(RemoverType::LocalModel, Some("key"), &config) {
            Err(e) if e.is_unavailable() => selector.create(RemoverType::Api, Some("key"), &config),
            other => other,
        };
        assert!(remover.is_ok());
    }
}
