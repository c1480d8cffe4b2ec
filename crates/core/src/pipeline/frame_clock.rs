use std::sync::Arc;

use crate::shared::constants::THROUGHPUT_WINDOW_MS;
use crate::shared::frame::Frame;

/// Emits one tick per distinct frame and measures tick throughput.
///
/// The host polls the source on every display refresh, so the same frame is
/// usually offered several times; only a changed capture timestamp counts.
#[derive(Debug)]
pub struct FrameClock {
    last_seen_ms: Option<u64>,
    window_start_ms: u64,
    window_count: u32,
    frames_per_second: u32,
    ticks: u64,
}

impl FrameClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_seen_ms: None,
            window_start_ms: now_ms,
            window_count: 0,
            frames_per_second: 0,
            ticks: 0,
        }
    }

    /// Returns the frame to process, or `None` for a repeat of the last one.
    pub fn on_frame_available(&mut self, frame: Arc<Frame>) -> Option<Arc<Frame>> {
        let ts = frame.captured_at_ms();
        if self.last_seen_ms == Some(ts) {
            return None;
        }
        self.last_seen_ms = Some(ts);
        self.window_count += 1;
        self.ticks += 1;
        Some(frame)
    }

    /// Closes the rolling window once it spans a full second and returns the
    /// most recently completed window's tick count.
    pub fn sample_throughput(&mut self, now_ms: u64) -> u32 {
        if now_ms.saturating_sub(self.window_start_ms) >= THROUGHPUT_WINDOW_MS {
            self.frames_per_second = self.window_count;
            self.window_count = 0;
            self.window_start_ms = now_ms;
        }
        self.frames_per_second
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Total ticks emitted since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
