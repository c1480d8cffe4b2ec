use std::sync::Arc;

use serde_json::Value;

use crate::detection::domain::detection_channel::DetectionChannel;
use crate::detection::domain::detector::DetectorError;
use crate::dispatch::domain::dispatch_job::DispatchOutcome;
use crate::dispatch::domain::endpoint_state::EndpointState;
use crate::dispatch::domain::result_dispatcher::ResultDispatcher;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::task_executor::{Task, TaskExecutor};
use crate::shared::channel_id::{ChannelId, ChannelMap};
use crate::shared::detection_result::DetectionResult;
use crate::shared::frame::Frame;

/// Fans each tick out to the channels that can take it and routes their
/// results to the overlay and to the channel's dispatcher.
///
/// Channels never wait on each other: detection runs on the executor, and a
/// channel still busy with an earlier frame simply skips the tick.
#[derive(Debug)]
pub struct ChannelManager {
    channels: ChannelMap<DetectionChannel>,
    dispatchers: ChannelMap<ResultDispatcher>,
}

impl ChannelManager {
    pub fn new(enabled: &[ChannelId]) -> Self {
        Self {
            channels: ChannelMap::from_fn(|id| DetectionChannel::new(id, enabled.contains(&id))),
            dispatchers: ChannelMap::from_fn(ResultDispatcher::new),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &DetectionChannel {
        self.channels.get(id)
    }

    pub fn dispatcher(&self, id: ChannelId) -> &ResultDispatcher {
        self.dispatchers.get(id)
    }

    /// True when every enabled channel has a loaded detector.
    pub fn all_enabled_ready(&self) -> bool {
        self.channels
            .iter()
            .all(|(_, channel)| !channel.is_enabled() || channel.is_ready())
    }

    /// Applies a toggle. Disabling clears the channel's result and overlay
    /// and stops its dispatcher right away; other channels are untouched.
    pub fn set_enabled(&mut self, id: ChannelId, enabled: bool, renderer: &mut OverlayRenderer) {
        if !self.channels.get_mut(id).set_enabled(enabled) {
            return;
        }
        log::info!("Channel {id} {}", if enabled { "enabled" } else { "disabled" });
        if !enabled {
            renderer.render(id, None);
            self.dispatchers.get_mut(id).stop();
        }
    }

    pub fn set_ready(&mut self, id: ChannelId, ready: bool) {
        self.channels.get_mut(id).set_ready(ready);
    }

    /// Submits detection for every enabled, ready, idle channel. Returns the
    /// number of detections started.
    pub fn process_frame(
        &mut self,
        frame: &Arc<Frame>,
        renderer: &mut OverlayRenderer,
        executor: &mut dyn TaskExecutor,
    ) -> usize {
        renderer.begin_frame(frame.width(), frame.height());

        let mut started = 0;
        for &id in ChannelId::ALL {
            let channel = self.channels.get_mut(id);
            if !channel.is_enabled() {
                if channel.clear_result() {
                    renderer.render(id, None);
                }
                self.dispatchers.get_mut(id).stop();
                continue;
            }
            if channel.should_detect() {
                channel.begin_detection();
                executor.submit(Task::Detect {
                    channel: id,
                    frame: frame.clone(),
                });
                started += 1;
            } else if channel.is_busy() {
                log::trace!("Channel {id} still busy, skipping frame {}", frame.captured_at_ms());
            }
        }
        started
    }

    /// Routes a detector outcome. Returns `true` if a fresh result was
    /// stored and forwarded.
    pub fn on_detection_finished(
        &mut self,
        id: ChannelId,
        captured_at_ms: u64,
        outcome: Result<Value, DetectorError>,
        endpoint: &EndpointState,
        renderer: &mut OverlayRenderer,
        executor: &mut dyn TaskExecutor,
    ) -> bool {
        let channel = self.channels.get_mut(id);
        let current = channel.complete_detection();

        let payload = match outcome {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Channel {id} detection failed: {e}");
                return false;
            }
        };
        if !current {
            log::debug!("Discarding {id} result from frame {captured_at_ms}: channel was toggled");
            return false;
        }

        let result = DetectionResult::new(id, captured_at_ms, payload);
        renderer.render(id, Some(&result));
        channel.store_result(result.clone());

        if let Some(job) = self.dispatchers.get_mut(id).offer(result, endpoint) {
            executor.submit(Task::Dispatch(job));
        }
        true
    }

    /// Frees the channel's in-flight slot and starts the pending follow-up.
    pub fn on_dispatch_finished(
        &mut self,
        id: ChannelId,
        outcome: &DispatchOutcome,
        endpoint: &EndpointState,
        executor: &mut dyn TaskExecutor,
    ) {
        if let Some(job) = self.dispatchers.get_mut(id).on_complete(outcome, endpoint) {
            executor.submit(Task::Dispatch(job));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::domain::endpoint_state::EndpointStatus;
    use crate::overlay::domain::drawing_surface::DrawingSurface;
    use serde_json::json;

    struct NullSurface;

    impl DrawingSurface for NullSurface {
        fn resize(&mut self, _width: u32, _height: u32) {}
        fn draw(&mut self, _channel: ChannelId, _result: &DetectionResult) {}
        fn clear(&mut self, _channel: ChannelId) {}
    }

    #[derive(Default)]
    struct RecordingExecutor {
        tasks: Vec<Task>,
    }

    impl TaskExecutor for RecordingExecutor {
        fn submit(&mut self, task: Task) {
            self.tasks.push(task);
        }
    }

    impl RecordingExecutor {
        fn detections(&self) -> Vec<ChannelId> {
            self.tasks
                .iter()
                .filter_map(|t| match t {
                    Task::Detect { channel, .. } => Some(*channel),
                    _ => None,
                })
                .collect()
        }

        fn dispatches(&self) -> Vec<(ChannelId, u64)> {
            self.tasks
                .iter()
                .filter_map(|t| match t {
                    Task::Dispatch(job) => Some((job.channel, job.result.captured_at_ms)),
                    _ => None,
                })
                .collect()
        }
    }

    fn frame(ts: u64) -> Arc<Frame> {
        Arc::new(Frame::new(vec![0u8; 12], 2, 2, 3, ts))
    }

    fn valid() -> EndpointState {
        EndpointState {
            url: "http://host".to_string(),
            status: EndpointStatus::Valid,
        }
    }

    fn ready_manager(enabled: &[ChannelId]) -> ChannelManager {
        let mut manager = ChannelManager::new(enabled);
        for &id in ChannelId::ALL {
            manager.set_ready(id, true);
        }
        manager
    }

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(Box::new(NullSurface))
    }

    #[test]
    fn test_only_enabled_and_ready_channels_detect() {
        let mut manager = ChannelManager::new(&[ChannelId::Face, ChannelId::Pose]);
        manager.set_ready(ChannelId::Face, true);
        let mut executor = RecordingExecutor::default();

        let started = manager.process_frame(&frame(1), &mut renderer(), &mut executor);

        assert_eq!(started, 1);
        assert_eq!(executor.detections(), vec![ChannelId::Face]);
    }

    #[test]
    fn test_busy_channel_skips_tick_without_affecting_others() {
        let mut manager = ready_manager(&[ChannelId::Face, ChannelId::Pose]);
        let mut renderer = renderer();
        let mut executor = RecordingExecutor::default();

        manager.process_frame(&frame(1), &mut renderer, &mut executor);
        manager.on_detection_finished(
            ChannelId::Pose,
            1,
            Ok(json!({})),
            &valid(),
            &mut renderer,
            &mut executor,
        );
        executor.tasks.clear();

        manager.process_frame(&frame(2), &mut renderer, &mut executor);
        assert_eq!(executor.detections(), vec![ChannelId::Pose]);
    }

    #[test]
    fn test_success_stores_result_and_dispatches() {
        let mut manager = ready_manager(&[ChannelId::Face]);
        let mut renderer = renderer();
        let mut executor = RecordingExecutor::default();
        manager.process_frame(&frame(5), &mut renderer, &mut executor);

        let accepted = manager.on_detection_finished(
            ChannelId::Face,
            5,
            Ok(json!({"faceLandmarks": []})),
            &valid(),
            &mut renderer,
            &mut executor,
        );

        assert!(accepted);
        assert_eq!(
            manager.channel(ChannelId::Face).last_result().unwrap().captured_at_ms,
            5
        );
        assert_eq!(executor.dispatches(), vec![(ChannelId::Face, 5)]);
    }

    #[test]
    fn test_failure_keeps_previous_result() {
        let mut manager = ready_manager(&[ChannelId::Hands]);
        let mut renderer = renderer();
        let mut executor = RecordingExecutor::default();

        manager.process_frame(&frame(1), &mut renderer, &mut executor);
        manager.on_detection_finished(
            ChannelId::Hands,
            1,
            Ok(json!("first")),
            &valid(),
            &mut renderer,
            &mut executor,
        );
        manager.on_dispatch_finished(
            ChannelId::Hands,
            &DispatchOutcome::Delivered,
            &valid(),
            &mut executor,
        );
        executor.tasks.clear();

        manager.process_frame(&frame(2), &mut renderer, &mut executor);
        let accepted = manager.on_detection_finished(
            ChannelId::Hands,
            2,
            Err(DetectorError::Inference {
                timestamp_ms: 2,
                message: "gpu lost".to_string(),
            }),
            &valid(),
            &mut renderer,
            &mut executor,
        );

        assert!(!accepted);
        let kept = manager.channel(ChannelId::Hands).last_result().unwrap();
        assert_eq!(kept.payload, json!("first"));
        assert!(executor.dispatches().is_empty());
        assert!(!manager.channel(ChannelId::Hands).is_busy());
    }

    #[test]
    fn test_disable_clears_result_and_stops_only_that_dispatcher() {
        let mut manager = ready_manager(&[ChannelId::Face, ChannelId::Pose]);
        let mut renderer = renderer();
        let mut executor = RecordingExecutor::default();

        for ts in [1, 2] {
            manager.process_frame(&frame(ts), &mut renderer, &mut executor);
            for id in [ChannelId::Face, ChannelId::Pose] {
                manager.on_detection_finished(
                    id,
                    ts,
                    Ok(json!(ts)),
                    &valid(),
                    &mut renderer,
                    &mut executor,
                );
            }
        }
        assert!(manager.dispatcher(ChannelId::Face).pending().is_some());
        assert!(manager.dispatcher(ChannelId::Pose).pending().is_some());

        manager.set_enabled(ChannelId::Face, false, &mut renderer);

        assert!(manager.channel(ChannelId::Face).last_result().is_none());
        assert!(manager.dispatcher(ChannelId::Face).pending().is_none());
        assert!(manager.dispatcher(ChannelId::Pose).is_in_flight());
        assert_eq!(
            manager.dispatcher(ChannelId::Pose).pending().unwrap().captured_at_ms,
            2
        );
    }

    #[test]
    fn test_result_for_channel_disabled_mid_detection_is_dropped() {
        let mut manager = ready_manager(&[ChannelId::Face]);
        let mut renderer = renderer();
        let mut executor = RecordingExecutor::default();
        manager.process_frame(&frame(1), &mut renderer, &mut executor);

        manager.set_enabled(ChannelId::Face, false, &mut renderer);
        let accepted = manager.on_detection_finished(
            ChannelId::Face,
            1,
            Ok(json!({})),
            &valid(),
            &mut renderer,
            &mut executor,
        );

        assert!(!accepted);
        assert!(manager.channel(ChannelId::Face).last_result().is_none());
        assert!(executor.dispatches().is_empty());
    }

    #[test]
    fn test_all_enabled_ready() {
        let mut manager = ChannelManager::new(&[ChannelId::Face, ChannelId::Hands]);
        assert!(!manager.all_enabled_ready());
        manager.set_ready(ChannelId::Face, true);
        assert!(!manager.all_enabled_ready());
        manager.set_ready(ChannelId::Hands, true);
        assert!(manager.all_enabled_ready());
    }

    #[test]
    fn test_no_enabled_channels_is_ready() {
        assert!(ChannelManager::new(&[]).all_enabled_ready());
    }
}
