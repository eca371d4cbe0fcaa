pub mod local_model_remover;
pub mod onnx_segmentation_backend;
pub mod remote_api_remover;
pub mod remover_factory;
