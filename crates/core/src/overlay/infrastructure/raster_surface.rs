use std::collections::BTreeMap;
use std::path::PathBuf;

use image::{Rgb, RgbImage};
use serde_json::Value;

use crate::overlay::domain::drawing_surface::DrawingSurface;
use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

const POINT_RADIUS: i64 = 1;

fn channel_color(channel: ChannelId) -> Rgb<u8> {
    match channel {
        ChannelId::Face => Rgb([0xE0, 0xE0, 0xE0]),
        ChannelId::Hands => Rgb([0x00, 0xFF, 0x00]),
        ChannelId::Pose => Rgb([0xFF, 0x30, 0x30]),
    }
}

/// Software overlay that plots landmark points into an RGB image.
///
/// Any JSON object in a payload carrying numeric `x` and `y` is treated as
/// a normalized landmark (`0.0..=1.0`, relative to the frame). Layers are
/// kept per channel and composed on demand; `flush` writes the composed
/// image to `output` when one is configured.
pub struct RasterSurface {
    width: u32,
    height: u32,
    layers: BTreeMap<ChannelId, Vec<(f64, f64)>>,
    output: Option<PathBuf>,
}

impl RasterSurface {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            width: 0,
            height: 0,
            layers: BTreeMap::new(),
            output,
        }
    }

    pub fn layer(&self, channel: ChannelId) -> Option<&[(f64, f64)]> {
        self.layers.get(&channel).map(|v| v.as_slice())
    }

    /// Renders all layers onto a black canvas of the current size.
    pub fn compose(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for (&channel, points) in &self.layers {
            let color = channel_color(channel);
            for &(x, y) in points {
                let cx = (x * self.width as f64) as i64;
                let cy = (y * self.height as f64) as i64;
                plot(&mut img, cx, cy, color);
            }
        }
        img
    }
}

fn plot(img: &mut RgbImage, cx: i64, cy: i64, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for py in (cy - POINT_RADIUS)..=(cy + POINT_RADIUS) {
        for px in (cx - POINT_RADIUS)..=(cx + POINT_RADIUS) {
            if px >= 0 && py >= 0 && px < w && py < h {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Collects every `{x, y}` object found anywhere in the payload.
fn collect_points(value: &Value, out: &mut Vec<(f64, f64)>) {
    match value {
        Value::Object(map) => {
            let x = map.get("x").and_then(Value::as_f64);
            let y = map.get("y").and_then(Value::as_f64);
            if let (Some(x), Some(y)) = (x, y) {
                out.push((x, y));
                return;
            }
            for child in map.values() {
                collect_points(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_points(child, out);
            }
        }
        _ => {}
    }
}

impl DrawingSurface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.layers.clear();
    }

    fn draw(&mut self, channel: ChannelId, result: &DetectionResult) {
        let mut points = Vec::new();
        collect_points(&result.payload, &mut points);
        self.layers.insert(channel, points);
    }

    fn clear(&mut self, channel: ChannelId) {
        self.layers.remove(&channel);
    }

    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(path) = &self.output else {
            return Ok(());
        };
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.compose().save(path)?;
        log::info!("Overlay written to {}", path.display());
        Ok(())
    }
}
