use std::sync::Arc;

use crate::dispatch::domain::dispatch_job::DispatchJob;
use crate::dispatch::domain::endpoint_validator::ProbeRequest;
use crate::shared::channel_id::ChannelId;
use crate::shared::frame::Frame;

/// Asynchronous work the event loop hands off. Each task's completion comes
/// back as a `PipelineEvent`.
#[derive(Debug)]
pub enum Task {
    Detect { channel: ChannelId, frame: Arc<Frame> },
    Dispatch(DispatchJob),
    Probe(ProbeRequest),
}

/// Runs tasks off the event loop.
///
/// This is a port: infrastructure provides the concrete executor (worker
/// threads); tests substitute a recorder and feed completions by hand.
/// `submit` must return immediately.
pub trait TaskExecutor: Send {
    fn submit(&mut self, task: Task);

    /// Stops workers and waits for them. Default: no-op.
    fn shutdown(&mut self) {}
}
