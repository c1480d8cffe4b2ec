use serde_json::Value;
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector failed to load: {0}")]
    Load(String),
    #[error("inference failed at {timestamp_ms}ms: {message}")]
    Inference { timestamp_ms: u64, message: String },
    #[error("detector worker is unavailable")]
    Unavailable,
}

/// Domain interface for a perception model (face, hand or pose landmarks).
///
/// Implementations may be stateful (e.g. video-mode trackers that expect
/// monotonically increasing timestamps), hence `&mut self`.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<Value, DetectorError>;
}

/// Builds a detector on its worker thread, so model loading never runs on
/// the event loop.
pub type DetectorFactory = Box<dyn FnOnce() -> Result<Box<dyn Detector>, DetectorError> + Send>;
