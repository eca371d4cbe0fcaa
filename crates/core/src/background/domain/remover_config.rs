use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::remover_error::RemoverError;
use crate::shared::constants::DEFAULT_SEGMENTATION_MODEL;

/// Which background-remover implementation to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoverType {
    Api,
    #[serde(alias = "local")]
    LocalModel,
}

impl RemoverType {
    pub const ALL: &[RemoverType] = &[RemoverType::Api, RemoverType::LocalModel];

    pub fn as_str(self) -> &'static str {
        match self {
            RemoverType::Api => "api",
            RemoverType::LocalModel => "local-model",
        }
    }
}

impl fmt::Display for RemoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoverType {
    type Err = RemoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(RemoverType::Api),
            "local-model" | "local" => Ok(RemoverType::LocalModel),
            other => Err(RemoverError::configuration(format!(
                "invalid remover type '{other}', expected one of: api, local-model"
            ))),
        }
    }
}

/// Named remover configurations tuned for avatar artwork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    AvatarCalidadMaxima,
    AvatarEquilibrado,
    ProcesamientoRapido,
    AvatarComplejo,
}

impl Preset {
    pub const ALL: &[Preset] = &[
        Preset::AvatarCalidadMaxima,
        Preset::AvatarEquilibrado,
        Preset::ProcesamientoRapido,
        Preset::AvatarComplejo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::AvatarCalidadMaxima => "avatar_calidad_maxima",
            Preset::AvatarEquilibrado => "avatar_equilibrado",
            Preset::ProcesamientoRapido => "procesamiento_rapido",
            Preset::AvatarComplejo => "avatar_complejo",
        }
    }

    pub fn config(self) -> BackgroundRemoverConfig {
        let (model, alpha_threshold, preserve_elements, smooth_edges) = match self {
            Preset::AvatarCalidadMaxima => ("isnet-general-use", 15, true, true),
            Preset::AvatarEquilibrado => ("isnet-general-use", 20, true, true),
            Preset::ProcesamientoRapido => ("u2net", 50, false, false),
            Preset::AvatarComplejo => ("isnet-general-use", 10, true, true),
        };
        BackgroundRemoverConfig {
            model: model.to_string(),
            alpha_threshold,
            preserve_elements,
            smooth_edges,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = RemoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Preset::ALL.iter().map(|p| p.name()).collect();
                RemoverError::configuration(format!(
                    "invalid preset '{s}', available: {}",
                    names.join(", ")
                ))
            })
    }
}

/// Settings for the local segmentation remover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundRemoverConfig {
    /// Segmentation model identifier, e.g. `isnet-general-use` or `u2net`.
    pub model: String,
    /// Alpha values below this are made fully transparent.
    pub alpha_threshold: u8,
    /// Keep semi-transparent accessories instead of hardening the mask.
    pub preserve_elements: bool,
    pub smooth_edges: bool,
}

impl Default for BackgroundRemoverConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_SEGMENTATION_MODEL.to_string(),
            alpha_threshold: 20,
            preserve_elements: true,
            smooth_edges: true,
        }
    }
}
