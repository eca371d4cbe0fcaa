use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::shared::constants::LOG_FILE_NAME;

/// Append-only `log.txt` in the output root listing images without a
/// detectable face.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(output_root: &Path) -> Self {
        Self {
            path: output_root.join(LOG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `could not locate face: {file_name}`.
    pub fn record_face_miss(&self, file_name: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "could not locate face: {file_name}")
    }
}
