pub mod channel_manager;
pub mod frame_clock;
pub mod infrastructure;
pub mod mocap_pipeline;
pub mod pipeline_event;
pub mod pipeline_logger;
pub mod task_executor;
