use std::fs;
use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use crate::background::domain::background_remover::BackgroundRemover;
use crate::background::domain::remover_error::RemoverError;
use crate::shared::constants::REMOVE_BG_API_URL;

/// Background remover backed by the remove.bg HTTP API.
///
/// Posts the image as multipart field `image_file` with `size=auto` and the
/// key in the `X-Api-Key` header. The response body is the cut-out image.
pub struct RemoteApiRemover {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl RemoteApiRemover {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RemoverError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RemoverError::configuration(
                "an API key is required for the remote background remover",
            ));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: REMOVE_BG_API_URL.to_string(),
        })
    }

    /// Points the remover at a different endpoint (self-hosted proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BackgroundRemover for RemoteApiRemover {
    fn remove_background(&mut self, input_path: &Path, output_path: &Path) -> Result<(), RemoverError> {
        if !input_path.is_file() {
            return Err(RemoverError::InputNotFound(input_path.to_path_buf()));
        }
        let bytes = fs::read(input_path).map_err(|e| RemoverError::Io {
            path: input_path.to_path_buf(),
            source: e,
        })?;

        let file_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let form = Form::new()
            .part("image_file", Part::bytes(bytes).file_name(file_name))
            .text("size", "auto");

        log::debug!("Posting {} to {}", input_path.display(), self.endpoint);
        let transport_err = |e: reqwest::Error| RemoverError::Transport {
            url: self.endpoint.clone(),
            source: e,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(transport_err)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(RemoverError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let content = response.bytes().map_err(transport_err)?;
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RemoverError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(output_path, &content).map_err(|e| RemoverError::Io {
            path: output_path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("avatar.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_empty_key_is_configuration_error() {
        let err = RemoteApiRemover::new("  ").err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_endpoint() {
        let remover = RemoteApiRemover::new("key").unwrap();
        assert_eq!(remover.endpoint(), REMOVE_BG_API_URL);
    }

    #[test]
    fn test_success_writes_response_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/removebg")
                .header("X-Api-Key", "secret");
            then.status(200).body("cutout-bytes");
        });

        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("out").join("avatar.png");

        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint(server.url("/removebg"));
        remover.remove_background(&input, &output).unwrap();

        mock.assert();
        assert_eq!(fs::read(&output).unwrap(), b"cutout-bytes");
    }

    #[test]
    fn test_request_carries_image_file_part_and_auto_size() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/removebg")
                .header("X-Api-Key", "secret")
                .body_contains("name=\"image_file\"")
                .body_contains("filename=\"avatar.txt\"")
                .body_contains("name=\"size\"")
                .body_contains("auto");
            then.status(200).body("cutout-bytes");
        });

        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("avatar.txt");
        fs::write(&input, "plain-image-bytes").unwrap();
        let output = tmp.path().join("avatar_out.png");

        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint(server.url("/removebg"));
        remover.remove_background(&input, &output).unwrap();

        mock.assert();
    }

    #[test]
    fn test_non_200_success_status_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/removebg");
            then.status(204);
        });

        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("avatar_out.png");

        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint(server.url("/removebg"));
        let err = remover.remove_background(&input, &output).unwrap_err();

        assert!(matches!(err, RemoverError::RemoteService { status: 204, .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_error_status_reports_status_and_body_without_output() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/removebg");
            then.status(402).body("insufficient credits");
        });

        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let output = tmp.path().join("avatar_out.png");

        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint(server.url("/removebg"));
        let err = remover.remove_background(&input, &output).unwrap_err();

        match err {
            RemoverError::RemoteService { status, body } => {
                assert_eq!(status, 402);
                assert_eq!(body, "insufficient credits");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_fails_before_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let tmp = TempDir::new().unwrap();
        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint(server.url("/removebg"));
        let err = remover
            .remove_background(&tmp.path().join("nope.png"), &tmp.path().join("out.png"))
            .unwrap_err();

        assert!(matches!(err, RemoverError::InputNotFound(_)));
        mock.assert_hits(0);
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path());
        let mut remover = RemoteApiRemover::new("secret")
            .unwrap()
            .with_endpoint("http://invalid.nonexistent.example.com/removebg");
        let err = remover
            .remove_background(&input, &tmp.path().join("out.png"))
            .unwrap_err();
        assert!(matches!(err, RemoverError::Transport { .. }));
    }
}
