use std::path::PathBuf;

use thiserror::Error;

/// Failures of background-remover construction and execution.
///
/// Callers may fall back to another remover on `BackendUnavailable`, never on
/// `Configuration`.
#[derive(Error, Debug)]
pub enum RemoverError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("background removal backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("no background remover available: install a segmentation model or provide an API key")]
    NoneAvailable,
    #[error("input image not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("remote service returned {status}: {body}")]
    RemoteService { status: u16, body: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("background removal failed for {}: {reason}", path.display())]
    Processing { path: PathBuf, reason: String },
}

impl RemoverError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::NoneAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_and_unavailable_are_distinct() {
        let config = RemoverError::configuration("missing key");
        let unavailable = RemoverError::unavailable("no model");

        assert!(config.is_configuration());
        assert!(!config.is_unavailable());
        assert!(unavailable.is_unavailable());
        assert!(!unavailable.is_configuration());
    }

    #[test]
    fn test_remote_service_message_carries_status_and_body() {
        let err = RemoverError::RemoteService {
            status: 402,
            body: "insufficient credits".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("402"));
        assert!(msg.contains("insufficient credits"));
    }

    #[test]
    fn test_input_not_found_names_path() {
        let err = RemoverError::InputNotFound(PathBuf::from("/tmp/missing.png"));
        assert!(err.to_string().contains("/tmp/missing.png"));
    }
}
