pub mod image_file_writer;
pub mod proportional_resizer;
