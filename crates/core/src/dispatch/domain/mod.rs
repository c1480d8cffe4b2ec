pub mod dispatch_job;
pub mod endpoint_client;
pub mod endpoint_state;
pub mod endpoint_validator;
pub mod result_dispatcher;
