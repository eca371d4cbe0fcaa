pub mod avatar_size;
pub mod constants;
pub mod face_rect;
pub mod model_resolver;
pub mod settings;
