use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::dispatch::domain::dispatch_job::DispatchOutcome;
use crate::dispatch::domain::endpoint_state::EndpointState;
use crate::dispatch::domain::endpoint_validator::EndpointValidator;
use crate::overlay::domain::drawing_surface::DrawingSurface;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::channel_manager::ChannelManager;
use crate::pipeline::frame_clock::FrameClock;
use crate::pipeline::pipeline_event::PipelineEvent;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::task_executor::{Task, TaskExecutor};
use crate::shared::channel_id::ChannelId;

/// Initial state handed to the pipeline by the host.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub endpoint_url: Option<String>,
    pub enabled: Vec<ChannelId>,
}

/// The single-threaded event loop that owns all pipeline state.
///
/// Every input (frames, toggles, URL changes) and every completion of
/// off-loop work arrives as a [`PipelineEvent`]. Handling an event never
/// blocks: detection, dispatch and probing are handed to the
/// [`TaskExecutor`] and report back later.
pub struct MocapPipeline {
    clock: FrameClock,
    channels: ChannelManager,
    validator: EndpointValidator,
    renderer: OverlayRenderer,
    executor: Box<dyn TaskExecutor>,
    logger: Box<dyn PipelineLogger>,
    started: Instant,
    last_fps: u32,
}

impl MocapPipeline {
    pub fn new(
        config: &PipelineConfig,
        surface: Box<dyn DrawingSurface>,
        executor: Box<dyn TaskExecutor>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let mut pipeline = Self {
            clock: FrameClock::new(0),
            channels: ChannelManager::new(&config.enabled),
            validator: EndpointValidator::new(),
            renderer: OverlayRenderer::new(surface),
            executor,
            logger,
            started: Instant::now(),
            last_fps: 0,
        };
        if let Some(url) = &config.endpoint_url {
            pipeline.set_endpoint_url(url);
        }
        pipeline
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    pub fn endpoint(&self) -> &EndpointState {
        self.validator.state()
    }

    pub fn frames_per_second(&self) -> u32 {
        self.clock.frames_per_second()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        &*self.logger
    }

    /// Processes events until `Shutdown`, `SourceEnded`, or every sender is
    /// dropped, then flushes the overlay and stops the executor.
    pub fn run(mut self, events: Receiver<PipelineEvent>) -> Self {
        log::info!("Pipeline running");
        for event in events.iter() {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.renderer.flush();
        self.executor.shutdown();
        self.logger.summary();
        log::info!("Pipeline stopped");
        self
    }

    pub fn handle(&mut self, event: PipelineEvent) -> ControlFlow<()> {
        match event {
            PipelineEvent::FrameAvailable(frame) => {
                match self.clock.on_frame_available(frame) {
                    Some(frame) => {
                        self.logger.count("ticks");
                        self.channels.process_frame(
                            &frame,
                            &mut self.renderer,
                            &mut *self.executor,
                        );
                    }
                    None => self.logger.count("duplicate_frames"),
                }
                self.sample_throughput();
            }
            PipelineEvent::SetChannelEnabled(id, enabled) => {
                self.channels.set_enabled(id, enabled, &mut self.renderer);
            }
            PipelineEvent::ChannelReady(id, ready) => {
                self.channels.set_ready(id, ready);
                if ready {
                    log::info!("Channel {id} ready");
                    if self.channels.all_enabled_ready() {
                        log::info!("All enabled channels ready");
                    }
                } else {
                    log::warn!("Channel {id} not ready");
                }
            }
            PipelineEvent::SetEndpointUrl(url) => self.set_endpoint_url(&url),
            PipelineEvent::DetectionFinished {
                channel,
                captured_at_ms,
                outcome,
                elapsed,
            } => {
                self.logger.timing(&format!("detect_{channel}"), millis(elapsed));
                if outcome.is_err() {
                    self.logger.count("detector_failures");
                }
                self.channels.on_detection_finished(
                    channel,
                    captured_at_ms,
                    outcome,
                    self.validator.state(),
                    &mut self.renderer,
                    &mut *self.executor,
                );
            }
            PipelineEvent::DispatchFinished {
                channel,
                outcome,
                elapsed,
            } => {
                self.logger.timing(&format!("dispatch_{channel}"), millis(elapsed));
                self.logger.count(match outcome {
                    DispatchOutcome::Delivered => "dispatch_delivered",
                    DispatchOutcome::Failed(_) => "dispatch_failed",
                });
                self.channels.on_dispatch_finished(
                    channel,
                    &outcome,
                    self.validator.state(),
                    &mut *self.executor,
                );
            }
            PipelineEvent::ProbeFinished {
                generation,
                outcome,
            } => {
                self.validator.on_probe_finished(generation, outcome);
            }
            PipelineEvent::SourceEnded => {
                log::info!("Frame source ended");
                return ControlFlow::Break(());
            }
            PipelineEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn set_endpoint_url(&mut self, url: &str) {
        if let Some(probe) = self.validator.set_url(url) {
            self.executor.submit(Task::Probe(probe));
        }
    }

    fn sample_throughput(&mut self) {
        let now_ms = self.started.elapsed().as_millis() as u64;
        let fps = self.clock.sample_throughput(now_ms);
        if fps != self.last_fps {
            log::debug!("Throughput: {fps} fps");
            self.logger.metric("fps", fps as f64);
            self.last_fps = fps;
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detector::DetectorError;
    use crate::dispatch::domain::endpoint_client::EndpointError;
    use crate::dispatch::domain::endpoint_state::EndpointStatus;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::detection_result::DetectionResult;
    use crate::shared::frame::Frame;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct NullSurface;

    impl DrawingSurface for NullSurface {
        fn resize(&mut self, _width: u32, _height: u32) {}
        fn draw(&mut self, _channel: ChannelId, _result: &DetectionResult) {}
        fn clear(&mut self, _channel: ChannelId) {}
    }

    #[derive(Clone, Default)]
    struct RecordingExecutor {
        tasks: Arc<Mutex<Vec<Task>>>,
    }

    impl TaskExecutor for RecordingExecutor {
        fn submit(&mut self, task: Task) {
            self.tasks.lock().unwrap().push(task);
        }
    }

    impl RecordingExecutor {
        fn take(&self) -> Vec<Task> {
            std::mem::take(&mut *self.tasks.lock().unwrap())
        }
    }

    fn pipeline(config: PipelineConfig) -> (MocapPipeline, RecordingExecutor) {
        let executor = RecordingExecutor::default();
        let pipeline = MocapPipeline::new(
            &config,
            Box::new(NullSurface),
            Box::new(executor.clone()),
            Box::new(NullPipelineLogger),
        );
        (pipeline, executor)
    }

    /// Handles an event that must not stop the loop.
    fn feed(pipeline: &mut MocapPipeline, event: PipelineEvent) {
        assert!(pipeline.handle(event).is_continue());
    }

    /// Pipeline with a validated `http://host` endpoint and the given
    /// channels enabled and ready.
    fn paired(enabled: &[ChannelId]) -> (MocapPipeline, RecordingExecutor) {
        let (mut pipeline, executor) = pipeline(PipelineConfig {
            endpoint_url: Some("http://host".to_string()),
            enabled: enabled.to_vec(),
        });
        let probe = match executor.take().pop() {
            Some(Task::Probe(probe)) => probe,
            other => panic!("expected probe, got {other:?}"),
        };
        feed(&mut pipeline, PipelineEvent::ProbeFinished {
            generation: probe.generation,
            outcome: Ok(json!({"is_mocap": true})),
        });
        for &id in enabled {
            feed(&mut pipeline, PipelineEvent::ChannelReady(id, true));
        }
        (pipeline, executor)
    }

    fn frame_event(ts: u64) -> PipelineEvent {
        PipelineEvent::FrameAvailable(Arc::new(Frame::new(vec![0u8; 12], 2, 2, 3, ts)))
    }

    fn detected(channel: ChannelId, ts: u64, outcome: Result<Value, DetectorError>) -> PipelineEvent {
        PipelineEvent::DetectionFinished {
            channel,
            captured_at_ms: ts,
            outcome,
            elapsed: Duration::from_millis(4),
        }
    }

    fn delivered(channel: ChannelId) -> PipelineEvent {
        PipelineEvent::DispatchFinished {
            channel,
            outcome: DispatchOutcome::Delivered,
            elapsed: Duration::from_millis(2),
        }
    }

    fn detect_channels(tasks: &[Task]) -> Vec<ChannelId> {
        tasks
            .iter()
            .filter_map(|t| match t {
                Task::Detect { channel, .. } => Some(*channel),
                _ => None,
            })
            .collect()
    }

    fn dispatch_jobs(tasks: Vec<Task>) -> Vec<(String, Value)> {
        tasks
            .into_iter()
            .filter_map(|t| match t {
                Task::Dispatch(job) => Some((job.url.clone(), job.body())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_pairing_then_face_result_posts_once() {
        let (mut pipeline, executor) = paired(&[ChannelId::Face]);
        assert_eq!(pipeline.endpoint().status, EndpointStatus::Valid);

        feed(&mut pipeline, frame_event(33));
        assert_eq!(detect_channels(&executor.take()), vec![ChannelId::Face]);

        let face = json!({"faceLandmarks": [[{"x": 0.5, "y": 0.5, "z": 0.0}]]});
        feed(&mut pipeline, detected(ChannelId::Face, 33, Ok(face.clone())));

        let jobs = dispatch_jobs(executor.take());
        assert_eq!(
            jobs,
            vec![(
                "http://host/set_face".to_string(),
                json!({"faceLandmarkerResult": face})
            )]
        );
    }

    #[test]
    fn test_probe_issued_for_configured_url() {
        let (pipeline, executor) = pipeline(PipelineConfig {
            endpoint_url: Some("http://host".to_string()),
            enabled: vec![],
        });
        assert_eq!(pipeline.endpoint().status, EndpointStatus::Validating);
        match executor.take().as_slice() {
            [Task::Probe(probe)] => assert_eq!(probe.url, "http://host/pair"),
            other => panic!("expected one probe, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_frame_detected_once() {
        let (mut pipeline, executor) = paired(&[ChannelId::Pose]);
        feed(&mut pipeline, frame_event(10));
        feed(&mut pipeline, detected(ChannelId::Pose, 10, Ok(json!({}))));
        feed(&mut pipeline, delivered(ChannelId::Pose));
        executor.take();

        feed(&mut pipeline, frame_event(10));
        assert!(detect_channels(&executor.take()).is_empty());
    }

    #[test]
    fn test_hand_failure_does_not_affect_face_and_pose() {
        let all = [ChannelId::Face, ChannelId::Hands, ChannelId::Pose];
        let (mut pipeline, executor) = paired(&all);

        feed(&mut pipeline, frame_event(1));
        assert_eq!(detect_channels(&executor.take()), all.to_vec());

        feed(&mut pipeline, detected(
            ChannelId::Hands,
            1,
            Err(DetectorError::Inference {
                timestamp_ms: 1,
                message: "boom".to_string(),
            }),
        ));
        feed(&mut pipeline, detected(ChannelId::Face, 1, Ok(json!("face"))));
        feed(&mut pipeline, detected(ChannelId::Pose, 1, Ok(json!("pose"))));

        let urls: Vec<String> = dispatch_jobs(executor.take())
            .into_iter()
            .map(|(url, _)| url)
            .collect();
        assert_eq!(urls, vec!["http://host/set_face", "http://host/set_pose"]);
        assert!(pipeline.channels().channel(ChannelId::Hands).last_result().is_none());

        // The failed channel takes the next tick normally.
        feed(&mut pipeline, frame_event(2));
        assert_eq!(detect_channels(&executor.take()), all.to_vec());
    }

    #[test]
    fn test_no_dispatch_while_endpoint_not_valid() {
        let (mut pipeline, executor) = pipeline(PipelineConfig {
            endpoint_url: Some("http://host".to_string()),
            enabled: vec![ChannelId::Face],
        });
        feed(&mut pipeline, PipelineEvent::ChannelReady(ChannelId::Face, true));
        executor.take();

        feed(&mut pipeline, frame_event(1));
        feed(&mut pipeline, detected(ChannelId::Face, 1, Ok(json!({}))));

        assert!(dispatch_jobs(executor.take()).is_empty());
        assert!(pipeline.channels().channel(ChannelId::Face).last_result().is_some());
    }

    #[test]
    fn test_failed_probe_halts_dispatch() {
        let (mut pipeline, executor) = pipeline(PipelineConfig {
            endpoint_url: Some("http://host".to_string()),
            enabled: vec![ChannelId::Face],
        });
        let generation = match executor.take().pop() {
            Some(Task::Probe(probe)) => probe.generation,
            _ => panic!("expected probe"),
        };
        feed(&mut pipeline, PipelineEvent::ProbeFinished {
            generation,
            outcome: Err(EndpointError::Transport {
                url: "http://host/pair".to_string(),
                message: "refused".to_string(),
            }),
        });
        feed(&mut pipeline, PipelineEvent::ChannelReady(ChannelId::Face, true));

        feed(&mut pipeline, frame_event(1));
        feed(&mut pipeline, detected(ChannelId::Face, 1, Ok(json!({}))));

        assert_eq!(pipeline.endpoint().status, EndpointStatus::Invalid);
        assert!(dispatch_jobs(executor.take()).is_empty());
    }

    #[test]
    fn test_url_change_revalidates_and_gates_pending() {
        let (mut pipeline, executor) = paired(&[ChannelId::Face]);
        feed(&mut pipeline, frame_event(1));
        feed(&mut pipeline, detected(ChannelId::Face, 1, Ok(json!(1))));
        feed(&mut pipeline, frame_event(2));
        feed(&mut pipeline, detected(ChannelId::Face, 2, Ok(json!(2))));
        executor.take();

        feed(&mut pipeline, PipelineEvent::SetEndpointUrl("http://elsewhere".to_string()));
        assert_eq!(pipeline.endpoint().status, EndpointStatus::Validating);
        feed(&mut pipeline, delivered(ChannelId::Face));

        let tasks = executor.take();
        assert!(matches!(tasks.as_slice(), [Task::Probe(p)] if p.url == "http://elsewhere/pair"));
        assert!(pipeline.channels().dispatcher(ChannelId::Face).pending().is_none());
    }

    #[test]
    fn test_coalesced_results_send_latest_after_completion() {
        let (mut pipeline, executor) = paired(&[ChannelId::Hands]);
        for ts in 1..=4 {
            feed(&mut pipeline, frame_event(ts));
            feed(&mut pipeline, detected(ChannelId::Hands, ts, Ok(json!(ts))));
        }
        let first = dispatch_jobs(executor.take());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].1, json!({"handLandmarkerResult": 1}));

        feed(&mut pipeline, delivered(ChannelId::Hands));
        let second = dispatch_jobs(executor.take());
        assert_eq!(
            second,
            vec![(
                "http://host/set_hands".to_string(),
                json!({"handLandmarkerResult": 4})
            )]
        );
    }

    #[test]
    fn test_disabling_one_channel_leaves_other_in_flight() {
        let (mut pipeline, executor) = paired(&[ChannelId::Face, ChannelId::Pose]);
        for ts in 1..=2 {
            feed(&mut pipeline, frame_event(ts));
            feed(&mut pipeline, detected(ChannelId::Face, ts, Ok(json!(ts))));
            feed(&mut pipeline, detected(ChannelId::Pose, ts, Ok(json!(ts))));
        }
        executor.take();

        feed(&mut pipeline, PipelineEvent::SetChannelEnabled(ChannelId::Face, false));

        let channels = pipeline.channels();
        assert!(channels.channel(ChannelId::Face).last_result().is_none());
        assert!(channels.dispatcher(ChannelId::Face).pending().is_none());
        assert!(channels.dispatcher(ChannelId::Pose).is_in_flight());
        assert!(channels.dispatcher(ChannelId::Pose).pending().is_some());

        // Face's in-flight request completes without a follow-up.
        feed(&mut pipeline, delivered(ChannelId::Face));
        feed(&mut pipeline, frame_event(3));
        let tasks = executor.take();
        assert!(dispatch_jobs(tasks).is_empty());
    }

    #[test]
    fn test_not_ready_channel_is_skipped() {
        let (mut pipeline, executor) = pipeline(PipelineConfig {
            endpoint_url: None,
            enabled: vec![ChannelId::Face, ChannelId::Hands],
        });
        feed(&mut pipeline, PipelineEvent::ChannelReady(ChannelId::Hands, true));

        feed(&mut pipeline, frame_event(1));
        assert_eq!(detect_channels(&executor.take()), vec![ChannelId::Hands]);
        assert!(!pipeline.channels().all_enabled_ready());
    }

    #[test]
    fn test_source_end_and_shutdown_stop_the_loop() {
        let (mut pipeline, _executor) = pipeline(PipelineConfig::default());
        assert!(pipeline.handle(frame_event(1)).is_continue());
        assert!(pipeline.handle(PipelineEvent::SourceEnded).is_break());
        assert!(pipeline.handle(PipelineEvent::Shutdown).is_break());
    }

    #[test]
    fn test_run_drains_events_until_shutdown() {
        let (pipeline, executor) = paired(&[ChannelId::Pose]);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(frame_event(1)).unwrap();
        tx.send(detected(ChannelId::Pose, 1, Ok(json!({"landmarks": []}))))
            .unwrap();
        tx.send(PipelineEvent::Shutdown).unwrap();
        tx.send(frame_event(2)).unwrap();

        let pipeline = pipeline.run(rx);

        assert!(pipeline.channels().channel(ChannelId::Pose).last_result().is_some());
        let tasks = executor.take();
        assert_eq!(detect_channels(&tasks), vec![ChannelId::Pose]);
        assert_eq!(dispatch_jobs(tasks).len(), 1);
    }
}
