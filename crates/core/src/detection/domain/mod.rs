pub mod detection_channel;
pub mod detector;
