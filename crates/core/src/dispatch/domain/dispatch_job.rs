use std::time::Instant;

use serde_json::Value;

use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

/// One dispatch request: a channel's result bound to its target URL.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub channel: ChannelId,
    pub result: DetectionResult,
    pub url: String,
    pub created_at: Instant,
}

impl DispatchJob {
    pub fn body(&self) -> Value {
        self.result.dispatch_body()
    }
}

/// How a dispatch request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Failed(String),
}
