use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::detection::domain::detector::DetectorError;
use crate::dispatch::domain::dispatch_job::DispatchOutcome;
use crate::dispatch::domain::endpoint_client::EndpointError;
use crate::shared::channel_id::ChannelId;
use crate::shared::frame::Frame;

/// Everything the event loop reacts to: host input (frames, toggles, URL
/// changes) and completions of work it handed to the task executor.
#[derive(Debug)]
pub enum PipelineEvent {
    FrameAvailable(Arc<Frame>),
    SetChannelEnabled(ChannelId, bool),
    ChannelReady(ChannelId, bool),
    SetEndpointUrl(String),
    DetectionFinished {
        channel: ChannelId,
        captured_at_ms: u64,
        outcome: Result<Value, DetectorError>,
        elapsed: Duration,
    },
    DispatchFinished {
        channel: ChannelId,
        outcome: DispatchOutcome,
        elapsed: Duration,
    },
    ProbeFinished {
        generation: u64,
        outcome: Result<Value, EndpointError>,
    },
    SourceEnded,
    Shutdown,
}
