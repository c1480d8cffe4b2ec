mod console;
mod settings;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{select, Receiver};

use mocap_stream_core::detection::domain::detector::{Detector, DetectorError, DetectorFactory};
use mocap_stream_core::detection::infrastructure::recorded_detector::RecordedDetector;
use mocap_stream_core::dispatch::infrastructure::reqwest_endpoint_client::ReqwestEndpointClient;
use mocap_stream_core::overlay::infrastructure::raster_surface::RasterSurface;
use mocap_stream_core::pipeline::infrastructure::threaded_task_executor::ThreadedTaskExecutor;
use mocap_stream_core::pipeline::mocap_pipeline::{MocapPipeline, PipelineConfig};
use mocap_stream_core::pipeline::pipeline_event::PipelineEvent;
use mocap_stream_core::pipeline::pipeline_logger::StatsPipelineLogger;
use mocap_stream_core::shared::channel_id::ChannelId;
use mocap_stream_core::shared::constants::{DEFAULT_REFRESH_HZ, DEFAULT_REQUEST_TIMEOUT};
use mocap_stream_core::video::infrastructure::frame_source_driver::FrameSourceDriver;
use mocap_stream_core::video::infrastructure::image_sequence_source::ImageSequenceSource;

use console::ConsoleCommand;
use settings::Settings;

/// Stream face, hand and pose results to a mocap display service.
#[derive(Parser)]
#[command(name = "mocap-stream")]
struct Cli {
    /// Directory of frames played back as the live video source.
    frames: PathBuf,

    /// Playback rate of the frame directory.
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Rate at which the source is polled (display refresh).
    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh_hz: u32,

    /// Restart the frame sequence when it ends.
    #[arg(long = "loop")]
    looping: bool,

    /// Base URL of the display service, e.g. http://192.168.1.20:8000.
    #[arg(long)]
    endpoint: Option<String>,

    /// Channels to enable (comma-separated: face, hands, pose).
    #[arg(long, value_delimiter = ',')]
    channels: Option<Vec<ChannelId>>,

    /// Recorded face results (JSON lines).
    #[arg(long)]
    face_results: Option<PathBuf>,

    /// Recorded hand results (JSON lines).
    #[arg(long)]
    hands_results: Option<PathBuf>,

    /// Recorded pose results (JSON lines).
    #[arg(long)]
    pose_results: Option<PathBuf>,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Stop after this many seconds.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Write the final overlay to this PNG.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Persist the endpoint and channel selection for future runs.
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    fn results_for(&self, channel: ChannelId) -> Option<&PathBuf> {
        match channel {
            ChannelId::Face => self.face_results.as_ref(),
            ChannelId::Hands => self.hands_results.as_ref(),
            ChannelId::Pose => self.pose_results.as_ref(),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    let source = ImageSequenceSource::open(&cli.frames, cli.fps, cli.looping)?;
    let loop_period_ms = if cli.looping { source.period_ms() } else { 0 };

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let client = ReqwestEndpointClient::new(Duration::from_secs(cli.timeout_secs))?;
    let mut executor = ThreadedTaskExecutor::new(Arc::new(client), events_tx.clone());
    for &channel in ChannelId::ALL {
        match cli.results_for(channel) {
            Some(path) => {
                executor.register_detector(channel, recorded_factory(path.clone(), loop_period_ms))
            }
            None if settings.is_enabled(channel) => {
                log::warn!("Channel {channel} is enabled but has no --{channel}-results file")
            }
            None => {}
        }
    }

    if settings.enabled_channels().is_empty() {
        log::warn!("No channels enabled; pass --channels or type `enable <channel>`");
    }

    let config = PipelineConfig {
        endpoint_url: settings.endpoint_url.clone(),
        enabled: settings.enabled_channels(),
    };
    let pipeline = MocapPipeline::new(
        &config,
        Box::new(RasterSurface::new(cli.overlay.clone())),
        Box::new(executor),
        Box::new(StatsPipelineLogger::new()),
    );

    let driver = FrameSourceDriver::spawn(Box::new(source), cli.refresh_hz, events_tx.clone());
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let pipeline_thread = std::thread::spawn(move || {
        let pipeline = pipeline.run(events_rx);
        let _ = done_tx.send(());
        pipeline
    });

    let (console_tx, console_rx) = crossbeam_channel::unbounded();
    console::spawn(console_tx);
    eprintln!("{}", console::HELP);

    let deadline = match cli.duration_secs {
        Some(secs) => crossbeam_channel::after(Duration::from_secs(secs)),
        None => crossbeam_channel::never(),
    };
    supervise(&cli, &driver, &events_tx, console_rx, deadline, done_rx);

    let pipeline = pipeline_thread
        .join()
        .map_err(|_| "pipeline thread panicked")?;
    driver.stop()?;

    log::info!(
        "Endpoint {} ended {}, last throughput {} fps",
        pipeline.endpoint().url,
        pipeline.endpoint().status,
        pipeline.frames_per_second()
    );
    if let Some(path) = &cli.overlay {
        log::info!("Overlay written to {}", path.display());
    }
    Ok(())
}

/// Forwards console commands until the pipeline stops or the run deadline
/// passes.
fn supervise(
    cli: &Cli,
    driver: &FrameSourceDriver,
    events: &crossbeam_channel::Sender<PipelineEvent>,
    mut console: Receiver<ConsoleCommand>,
    deadline: Receiver<std::time::Instant>,
    done: Receiver<()>,
) {
    loop {
        let command = select! {
            recv(console) -> command => command,
            recv(deadline) -> _ => {
                log::info!("Run duration elapsed");
                let _ = events.send(PipelineEvent::Shutdown);
                return;
            }
            recv(done) -> _ => return,
        };
        match command {
            Ok(ConsoleCommand::Pipeline(event)) => {
                if events.send(event).is_err() {
                    return;
                }
            }
            Ok(ConsoleCommand::SwitchSource(dir)) => {
                match ImageSequenceSource::open(&dir, cli.fps, cli.looping) {
                    Ok(source) => driver.switch_source(Box::new(source)),
                    Err(e) => log::warn!("Keeping current source: {e}"),
                }
            }
            // stdin closed; keep running until the source ends or time is up
            Err(_) => console = crossbeam_channel::never(),
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::load();
    if let Some(url) = &cli.endpoint {
        settings.endpoint_url = Some(url.clone());
    }
    if let Some(channels) = &cli.channels {
        settings.set_enabled_channels(channels);
    }
    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Saved settings to {}", path.display());
    }
    Ok(settings)
}

fn recorded_factory(path: PathBuf, loop_period_ms: u64) -> DetectorFactory {
    Box::new(move || -> Result<Box<dyn Detector>, DetectorError> {
        let records = RecordedDetector::load(&path)?;
        log::info!("Replaying {} recorded results from {}", records.len(), path.display());
        let detector: Box<dyn Detector> =
            Box::new(RecordedDetector::new(records).with_loop_period(loop_period_ms));
        Ok(detector)
    })
}
