pub mod image_crop;
pub mod image_resizer;
pub mod image_writer;
