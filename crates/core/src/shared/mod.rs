pub mod channel_id;
pub mod constants;
pub mod detection_result;
pub mod frame;
