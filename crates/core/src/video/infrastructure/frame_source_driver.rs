use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::pipeline::pipeline_event::PipelineEvent;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

enum DriverCommand {
    Switch(Box<dyn FrameSource>),
    Stop,
}

/// Polls the active [`FrameSource`] at the display refresh rate and posts
/// every polled frame to the event loop.
///
/// Repeated polls of an unchanged source post the same frame again; the
/// frame clock drops them.
pub struct FrameSourceDriver {
    commands: Sender<DriverCommand>,
    handle: Option<JoinHandle<Result<(), FrameSourceError>>>,
}

impl FrameSourceDriver {
    pub fn spawn(
        source: Box<dyn FrameSource>,
        refresh_hz: u32,
        events: Sender<PipelineEvent>,
    ) -> Self {
        let (commands, command_rx) = crossbeam_channel::unbounded();
        let interval = Duration::from_secs_f64(1.0 / f64::from(refresh_hz.max(1)));
        let handle = std::thread::spawn(move || drive(source, interval, command_rx, events));
        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// Replaces the active source. Playback of the new source starts at
    /// elapsed time zero.
    pub fn switch_source(&self, source: Box<dyn FrameSource>) {
        if self.commands.send(DriverCommand::Switch(source)).is_err() {
            log::warn!("Frame source driver already stopped, ignoring source switch");
        }
    }

    /// Stops polling and returns the error that ended playback, if any.
    pub fn stop(mut self) -> Result<(), FrameSourceError> {
        let _ = self.commands.send(DriverCommand::Stop);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::error!("Frame source driver thread panicked");
                Ok(())
            }),
            None => Ok(()),
        }
    }
}

impl Drop for FrameSourceDriver {
    fn drop(&mut self) {
        let _ = self.commands.send(DriverCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn drive(
    mut source: Box<dyn FrameSource>,
    interval: Duration,
    commands: Receiver<DriverCommand>,
    events: Sender<PipelineEvent>,
) -> Result<(), FrameSourceError> {
    let ticker = crossbeam_channel::tick(interval);
    let mut started = Instant::now();
    log::info!("Polling {} every {:.1?}", source.name(), interval);

    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(DriverCommand::Switch(next)) => {
                    log::info!("Switching frame source {} -> {}", source.name(), next.name());
                    source = next;
                    started = Instant::now();
                }
                Ok(DriverCommand::Stop) | Err(_) => return Ok(()),
            },
            recv(ticker) -> _ => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match source.current_frame(elapsed_ms) {
                    Ok(Some(frame)) => {
                        if events.send(PipelineEvent::FrameAvailable(frame)).is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {
                        log::info!("Frame source {} ended", source.name());
                        let _ = events.send(PipelineEvent::SourceEnded);
                        return Ok(());
                    }
                    Err(e) => {
                        log::error!("Frame source {} failed: {e}", source.name());
                        let _ = events.send(PipelineEvent::SourceEnded);
                        return Err(e);
                    }
                }
            }
        }
    }
}
