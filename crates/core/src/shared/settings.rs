use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::APP_DIR_NAME;
use crate::background::domain::remover_config::{BackgroundRemoverConfig, Preset, RemoverType};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Run configuration, read once before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remover: RemoverType,
    /// When set, overrides the discrete `background` fields.
    pub preset: Option<Preset>,
    pub background: BackgroundRemoverConfig,
    pub api_key: Option<String>,
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remover: RemoverType::LocalModel,
            preset: Some(Preset::AvatarEquilibrado),
            background: BackgroundRemoverConfig::default(),
            api_key: None,
            models_dir: None,
        }
    }
}

impl Settings {
    /// Effective local-remover configuration.
    pub fn remover_config(&self) -> BackgroundRemoverConfig {
        match self.preset {
            Some(preset) => preset.config(),
            None => self.background.clone(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads the settings file from the platform config directory, falling
    /// back to defaults when it does not exist.
    pub fn load_default() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.remover, RemoverType::LocalModel);
        assert_eq!(settings.preset, Some(Preset::AvatarEquilibrado));
        assert!(settings.api_key.is_none());
        assert!(settings.models_dir.is_none());
    }

    #[test]
    fn test_preset_overrides_discrete_fields() {
        let settings = Settings {
            preset: Some(Preset::ProcesamientoRapido),
            background: BackgroundRemoverConfig {
                alpha_threshold: 99,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(settings.remover_config().model, "u2net");
        assert_eq!(settings.remover_config().alpha_threshold, 50);
    }

    #[test]
    fn test_discrete_fields_used_without_preset() {
        let settings = Settings {
            preset: None,
            background: BackgroundRemoverConfig {
                alpha_threshold: 99,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(settings.remover_config().alpha_threshold, 99);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "remover": "api", "preset": null, "background": { "alpha_threshold": 5 } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.remover, RemoverType::Api);
        assert_eq!(settings.preset, None);
        assert_eq!(settings.background.alpha_threshold, 5);
        assert_eq!(settings.background.model, "isnet-general-use");
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = Settings {
            api_key: Some("key".into()),
            models_dir: Some(PathBuf::from("/opt/models")),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = Settings::load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_unknown_preset_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "preset": "ultra" }"#).unwrap();
        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            SettingsError::Parse { .. }
        ));
    }
}
