pub mod frame_source_driver;
pub mod image_sequence_source;
