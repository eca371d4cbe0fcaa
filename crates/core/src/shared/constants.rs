pub const FACE_MODEL_NAME: &str = "res10_300x300_ssd_iter_140000.onnx";

pub const REMOVE_BG_API_URL: &str = "https://api.remove.bg/v1.0/removebg";

/// Download location for the segmentation models known to the local remover.
pub const SEGMENTATION_MODEL_BASE_URL: &str =
    "https://github.com/danielgatis/rembg/releases/download/v0.0.0";

pub const DEFAULT_SEGMENTATION_MODEL: &str = "isnet-general-use";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub const LOG_FILE_NAME: &str = "log.txt";
pub const ERROR_DIR_PREFIX: &str = "error_";
pub const ORIGINAL_FILE_NAME: &str = "original.png";

/// Directory name used under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "Avatar Cutter";
