use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

/// Plays a directory of still images as a fixed-rate video source.
///
/// Files are ordered by name. Decoding uses the `image` crate and happens
/// lazily, once per displayed frame. Capture timestamps keep increasing
/// across loops so downstream trackers always see a monotonic clock.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    fps: f64,
    looping: bool,
    current: Option<(u64, Arc<Frame>)>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64, looping: bool) -> Result<Self, FrameSourceError> {
        if fps.is_nan() || fps <= 0.0 {
            return Err(FrameSourceError::Open {
                path: dir.to_path_buf(),
                message: format!("fps must be positive, got {fps}"),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| FrameSourceError::Open {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(FrameSourceError::Empty(dir.to_path_buf()));
        }

        log::info!("Opened {} frames from {} at {fps} fps", paths.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            paths,
            fps,
            looping,
            current: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    /// Duration of one pass through the sequence.
    pub fn period_ms(&self) -> u64 {
        self.offset_ms(self.paths.len() as u64)
    }

    /// Offset of `position` within one pass, rounded to whole ms.
    fn offset_ms(&self, position: u64) -> u64 {
        (position as f64 * 1000.0 / self.fps).round() as u64
    }

    /// Pass `n` starts at exactly `n * period_ms()`, so `timestamp % period`
    /// always maps back to the frame's position in the sequence.
    fn timestamp_ms(&self, index: u64) -> u64 {
        let len = self.paths.len() as u64;
        (index / len) * self.period_ms() + self.offset_ms(index % len)
    }

    fn decode(&self, index: u64) -> Result<Arc<Frame>, FrameSourceError> {
        let path = &self.paths[(index % self.paths.len() as u64) as usize];
        let img = image::open(path)
            .map_err(|e| FrameSourceError::Decode {
                path: path.clone(),
                message: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Arc::new(Frame::new(
            img.into_raw(),
            width,
            height,
            3,
            self.timestamp_ms(index),
        )))
    }
}

impl FrameSource for ImageSequenceSource {
    fn current_frame(&mut self, elapsed_ms: u64) -> Result<Option<Arc<Frame>>, FrameSourceError> {
        let index = (elapsed_ms as f64 * self.fps / 1000.0).floor() as u64;
        if !self.looping && index >= self.paths.len() as u64 {
            return Ok(None);
        }

        if let Some((cached, frame)) = &self.current {
            if *cached == index {
                return Ok(Some(frame.clone()));
            }
        }

        let frame = self.decode(index)?;
        self.current = Some((index, frame.clone()));
        Ok(Some(frame))
    }

    fn name(&self) -> String {
        self.dir.display().to_string()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
