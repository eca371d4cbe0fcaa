use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model {name} not found (searched: {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file by name without touching the network.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled directory (development checkouts, pre-packaged installs)
pub fn resolve(name: &str, bundled_dir: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir().ok();
    resolve_in(name, cache_dir.as_deref(), bundled_dir)
}

fn resolve_in(
    name: &str,
    cache_dir: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let candidates: Vec<PathBuf> = [cache_dir, bundled_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(name))
        .collect();

    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| ModelResolveError::NotFound {
            name: name.to_string(),
            searched: candidates,
        })
}

/// Download a model into the user cache directory, returning its path.
pub fn fetch(name: &str, url: &str, progress: Option<ProgressFn>) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let dest = cache_dir.join(name);
    download(url, &dest, progress)?;
    Ok(dest)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Avatar Cutter/models/`
/// - Linux: `$XDG_CACHE_HOME/Avatar Cutter/models/` or `~/.cache/Avatar Cutter/models/`
/// - Windows: `%LOCALAPPDATA%/Avatar Cutter/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |reason: String| ModelResolveError::Download {
        url: url.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url).map_err(|e| download_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(download_err(format!("HTTP {}", response.status())));
    }

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let bytes = response.bytes().map_err(|e| download_err(e.to_string()))?;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    })?;

    let chunk_size = 1024 * 1024;
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(|e| ModelResolveError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(|e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
