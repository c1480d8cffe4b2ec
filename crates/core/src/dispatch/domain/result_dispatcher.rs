use std::time::Instant;

use super::dispatch_job::{DispatchJob, DispatchOutcome};
use super::endpoint_state::EndpointState;
use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

/// Coalescing single-flight sender for one channel.
///
/// At most one request is in flight. Results offered meanwhile overwrite a
/// single `pending` slot, so the endpoint always receives the newest state
/// without a backlog. Failed sends are never retried.
///
/// The dispatcher performs no I/O. It returns the [`DispatchJob`] to start
/// and expects [`on_complete`](Self::on_complete) when that job finishes.
#[derive(Debug)]
pub struct ResultDispatcher {
    channel: ChannelId,
    in_flight: bool,
    pending: Option<DetectionResult>,
    sent: u64,
    failed: u64,
    coalesced: u64,
}

impl ResultDispatcher {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            in_flight: false,
            pending: None,
            sent: 0,
            failed: 0,
            coalesced: 0,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn pending(&self) -> Option<&DetectionResult> {
        self.pending.as_ref()
    }

    /// Requests that completed with a 2xx response.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Pending results overwritten before they could be sent.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Offers a fresh result. Returns the job to start now, if any.
    ///
    /// Results offered while the endpoint is not valid are dropped.
    pub fn offer(
        &mut self,
        result: DetectionResult,
        endpoint: &EndpointState,
    ) -> Option<DispatchJob> {
        if !endpoint.is_valid() {
            log::trace!("Dropping {} result: endpoint {}", self.channel, endpoint.status);
            return None;
        }
        if self.in_flight {
            if self.pending.replace(result).is_some() {
                self.coalesced += 1;
            }
            return None;
        }
        Some(self.start(result, endpoint))
    }

    /// Records the end of the in-flight request and returns the follow-up
    /// job for the pending result, if one accumulated and the endpoint is
    /// still valid.
    pub fn on_complete(
        &mut self,
        outcome: &DispatchOutcome,
        endpoint: &EndpointState,
    ) -> Option<DispatchJob> {
        if !self.in_flight {
            log::debug!("Ignoring completion for idle {} dispatcher", self.channel);
            return None;
        }
        self.in_flight = false;

        match outcome {
            DispatchOutcome::Delivered => self.sent += 1,
            DispatchOutcome::Failed(reason) => {
                self.failed += 1;
                log::warn!("Failed to send {} data: {reason}", self.channel);
            }
        }

        let next = self.pending.take()?;
        if !endpoint.is_valid() {
            log::debug!("Dropping pending {} result: endpoint {}", self.channel, endpoint.status);
            return None;
        }
        Some(self.start(next, endpoint))
    }

    /// Stops sending for this channel: the pending result is discarded. An
    /// in-flight request is left to finish on its own.
    pub fn stop(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("Discarded pending {} result on stop", self.channel);
        }
    }

    fn start(&mut self, result: DetectionResult, endpoint: &EndpointState) -> DispatchJob {
        self.in_flight = true;
        DispatchJob {
            channel: self.channel,
            url: endpoint.route_url(&format!("/set_{}", self.channel.route())),
            result,
            created_at: Instant::now(),
        }
    }
}
