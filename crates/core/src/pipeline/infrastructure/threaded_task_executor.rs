use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::detection::domain::detector::{DetectorError, DetectorFactory};
use crate::dispatch::domain::dispatch_job::{DispatchJob, DispatchOutcome};
use crate::dispatch::domain::endpoint_client::EndpointClient;
use crate::dispatch::domain::endpoint_validator::ProbeRequest;
use crate::pipeline::pipeline_event::PipelineEvent;
use crate::pipeline::task_executor::{Task, TaskExecutor};
use crate::shared::channel_id::{ChannelId, ChannelMap};
use crate::shared::frame::Frame;

/// Runs pipeline tasks on dedicated worker threads.
///
/// Layout: one detector thread and one dispatch thread per channel, plus a
/// short-lived thread per endpoint probe. Workers report completions on the
/// event channel, so a slow detector or a slow network only ever delays its
/// own channel.
pub struct ThreadedTaskExecutor {
    events: Sender<PipelineEvent>,
    client: Arc<dyn EndpointClient>,
    detect_txs: ChannelMap<Option<Sender<Arc<Frame>>>>,
    dispatch_txs: ChannelMap<Option<Sender<DispatchJob>>>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadedTaskExecutor {
    pub fn new(client: Arc<dyn EndpointClient>, events: Sender<PipelineEvent>) -> Self {
        let mut handles = Vec::new();
        let dispatch_txs = ChannelMap::from_fn(|channel| {
            let (tx, rx) = crossbeam_channel::unbounded::<DispatchJob>();
            handles.push(spawn_dispatcher(channel, client.clone(), rx, events.clone()));
            Some(tx)
        });
        Self {
            events,
            client,
            detect_txs: ChannelMap::default(),
            dispatch_txs,
            handles,
        }
    }

    /// Starts the detector worker for `channel`. The factory runs on the
    /// worker thread; the channel reports ready once it succeeds.
    pub fn register_detector(&mut self, channel: ChannelId, factory: DetectorFactory) {
        let (tx, rx) = crossbeam_channel::bounded::<Arc<Frame>>(1);
        self.handles
            .push(spawn_detector(channel, factory, rx, self.events.clone()));
        *self.detect_txs.get_mut(channel) = Some(tx);
    }

    fn post(&self, event: PipelineEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Event loop gone, dropping completion");
        }
    }

    fn submit_detect(&self, channel: ChannelId, frame: Arc<Frame>) {
        let captured_at_ms = frame.captured_at_ms();
        let unavailable = || PipelineEvent::DetectionFinished {
            channel,
            captured_at_ms,
            outcome: Err(DetectorError::Unavailable),
            elapsed: Default::default(),
        };
        match self.detect_txs.get(channel) {
            Some(tx) => match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Detector {channel} still has a queued frame, dropping {captured_at_ms}");
                    self.post(unavailable());
                }
                Err(TrySendError::Disconnected(_)) => self.post(unavailable()),
            },
            None => self.post(unavailable()),
        }
    }

    fn submit_dispatch(&self, job: DispatchJob) {
        let channel = job.channel;
        let sent = self
            .dispatch_txs
            .get(channel)
            .as_ref()
            .is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            self.post(PipelineEvent::DispatchFinished {
                channel,
                outcome: DispatchOutcome::Failed("dispatch worker unavailable".to_string()),
                elapsed: Default::default(),
            });
        }
    }
}

impl TaskExecutor for ThreadedTaskExecutor {
    fn submit(&mut self, task: Task) {
        match task {
            Task::Detect { channel, frame } => self.submit_detect(channel, frame),
            Task::Dispatch(job) => self.submit_dispatch(job),
            Task::Probe(request) => {
                self.handles.retain(|h| !h.is_finished());
                let handle = spawn_probe(request, self.client.clone(), self.events.clone());
                self.handles.push(handle);
            }
        }
    }

    /// Closes every worker queue and joins the threads.
    fn shutdown(&mut self) {
        for &channel in ChannelId::ALL {
            self.detect_txs.get_mut(channel).take();
            self.dispatch_txs.get_mut(channel).take();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Pipeline worker thread panicked");
            }
        }
    }
}

impl Drop for ThreadedTaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_detector(
    channel: ChannelId,
    factory: DetectorFactory,
    frame_rx: Receiver<Arc<Frame>>,
    events: Sender<PipelineEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let started = Instant::now();
        let mut detector = match factory() {
            Ok(detector) => detector,
            Err(e) => {
                log::error!("Failed to load {channel} detector: {e}");
                let _ = events.send(PipelineEvent::ChannelReady(channel, false));
                return;
            }
        };
        log::info!("Loaded {channel} detector in {:.0?}", started.elapsed());
        if events.send(PipelineEvent::ChannelReady(channel, true)).is_err() {
            return;
        }

        for frame in frame_rx {
            let started = Instant::now();
            let outcome = detector.detect(&frame, frame.captured_at_ms());
            let event = PipelineEvent::DetectionFinished {
                channel,
                captured_at_ms: frame.captured_at_ms(),
                outcome,
                elapsed: started.elapsed(),
            };
            if events.send(event).is_err() {
                break;
            }
        }
    })
}

fn spawn_dispatcher(
    channel: ChannelId,
    client: Arc<dyn EndpointClient>,
    job_rx: Receiver<DispatchJob>,
    events: Sender<PipelineEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let outcome = match client.post_json(&job.url, &job.body()) {
                Ok(()) => DispatchOutcome::Delivered,
                Err(e) => DispatchOutcome::Failed(e.to_string()),
            };
            let event = PipelineEvent::DispatchFinished {
                channel,
                outcome,
                elapsed: job.created_at.elapsed(),
            };
            if events.send(event).is_err() {
                break;
            }
        }
    })
}

fn spawn_probe(
    request: ProbeRequest,
    client: Arc<dyn EndpointClient>,
    events: Sender<PipelineEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let outcome = client.get_json(&request.url);
        let _ = events.send(PipelineEvent::ProbeFinished {
            generation: request.generation,
            outcome,
        });
    })
}
