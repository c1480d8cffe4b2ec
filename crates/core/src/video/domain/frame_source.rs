use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("failed to open source {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("no frames found in {0}")]
    Empty(PathBuf),
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// A live video source polled at the host's refresh rate.
///
/// Polling faster than the source produces frames returns the same frame
/// (same capture timestamp) again; the frame clock drops those repeats.
pub trait FrameSource: Send {
    /// Frame current at `elapsed_ms` since playback started, or `None` once
    /// the source is exhausted.
    fn current_frame(&mut self, elapsed_ms: u64) -> Result<Option<Arc<Frame>>, FrameSourceError>;

    /// Human-readable source name for logs.
    fn name(&self) -> String;
}
