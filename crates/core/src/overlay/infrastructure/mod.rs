pub mod annotation;
pub mod image_file_sink;
