pub mod background_remover;
pub mod remover_config;
pub mod remover_error;
pub mod segmentation_backend;
