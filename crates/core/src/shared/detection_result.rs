use serde_json::{Map, Value};

use super::channel_id::ChannelId;

/// Structured output of one detector call.
///
/// The payload is opaque to the pipeline: it is handed verbatim to the
/// overlay renderer and serialized verbatim into the dispatch body.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub channel: ChannelId,
    pub captured_at_ms: u64,
    pub payload: Value,
}

impl DetectionResult {
    pub fn new(channel: ChannelId, captured_at_ms: u64, payload: Value) -> Self {
        Self {
            channel,
            captured_at_ms,
            payload,
        }
    }

    /// Body posted to the endpoint: `{"<payload key>": <payload>}`.
    pub fn dispatch_body(&self) -> Value {
        let mut body = Map::with_capacity(1);
        body.insert(self.channel.payload_key().to_string(), self.payload.clone());
        Value::Object(body)
    }
}
