use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

/// Per-channel detection state read and updated by the channel manager.
///
/// `enabled` belongs to the UI layer and `ready` to the detector host; the
/// pipeline only flips them in response to their events. Each disable bumps
/// an epoch so a detection that straddles a toggle is recognised as stale.
#[derive(Debug, Clone)]
pub struct DetectionChannel {
    id: ChannelId,
    enabled: bool,
    ready: bool,
    last_result: Option<DetectionResult>,
    epoch: u64,
    outstanding: Option<u64>,
}

impl DetectionChannel {
    pub fn new(id: ChannelId, enabled: bool) -> Self {
        Self {
            id,
            enabled,
            ready: false,
            last_result: None,
            epoch: 0,
            outstanding: None,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn last_result(&self) -> Option<&DetectionResult> {
        self.last_result.as_ref()
    }

    /// Returns `true` if the flag actually changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        if !enabled {
            self.epoch += 1;
            self.last_result = None;
        }
        true
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Enabled, loaded, and not still working on a previous frame.
    pub fn should_detect(&self) -> bool {
        self.enabled && self.ready && self.outstanding.is_none()
    }

    pub fn begin_detection(&mut self) {
        self.outstanding = Some(self.epoch);
    }

    /// Marks the outstanding detection complete.
    ///
    /// Returns `true` only if the channel stayed enabled from submission to
    /// completion, i.e. the result may be stored and forwarded.
    pub fn complete_detection(&mut self) -> bool {
        match self.outstanding.take() {
            Some(epoch) => self.enabled && epoch == self.epoch,
            None => false,
        }
    }

    pub fn store_result(&mut self, result: DetectionResult) {
        self.last_result = Some(result);
    }

    /// Returns `true` if a result was present.
    pub fn clear_result(&mut self) -> bool {
        self.last_result.take().is_some()
    }
}
