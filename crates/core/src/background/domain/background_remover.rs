use std::path::Path;

use super::remover_error::RemoverError;

/// Domain interface for background removal.
///
/// Reads the image at `input_path` and writes a copy with the background made
/// transparent to `output_path`. Never a silent no-op: a missing input or a
/// backend failure is always an error.
pub trait BackgroundRemover: Send {
    fn remove_background(&mut self, input_path: &Path, output_path: &Path)
        -> Result<(), RemoverError>;
}
