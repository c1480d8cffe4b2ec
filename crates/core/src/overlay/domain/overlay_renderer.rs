use super::drawing_surface::DrawingSurface;
use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

/// Paints per-channel results onto a surface sized to the current frame.
pub struct OverlayRenderer {
    surface: Box<dyn DrawingSurface>,
    size: Option<(u32, u32)>,
}

impl OverlayRenderer {
    pub fn new(surface: Box<dyn DrawingSurface>) -> Self {
        Self {
            surface,
            size: None,
        }
    }

    /// Resizes the surface only when the frame dimensions change.
    pub fn begin_frame(&mut self, width: u32, height: u32) {
        if self.size != Some((width, height)) {
            log::debug!("Overlay surface resized to {width}x{height}");
            self.surface.resize(width, height);
            self.size = Some((width, height));
        }
    }

    /// Draws `result`, or clears the channel's layer when there is none.
    pub fn render(&mut self, channel: ChannelId, result: Option<&DetectionResult>) {
        match result {
            Some(result) => self.surface.draw(channel, result),
            None => self.surface.clear(channel),
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.surface.flush() {
            log::warn!("Failed to flush overlay surface: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, PartialEq)]
    enum Call {
        Resize(u32, u32),
        Draw(ChannelId, u64),
        Clear(ChannelId),
    }

    struct RecordingSurface(Arc<Mutex<Vec<Call>>>);

    impl DrawingSurface for RecordingSurface {
        fn resize(&mut self, width: u32, height: u32) {
            self.0.lock().unwrap().push(Call::Resize(width, height));
        }
        fn draw(&mut self, channel: ChannelId, result: &DetectionResult) {
            self.0
                .lock()
                .unwrap()
                .push(Call::Draw(channel, result.captured_at_ms));
        }
        fn clear(&mut self, channel: ChannelId) {
            self.0.lock().unwrap().push(Call::Clear(channel));
        }
    }

    fn renderer() -> (OverlayRenderer, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let renderer = OverlayRenderer::new(Box::new(RecordingSurface(calls.clone())));
        (renderer, calls)
    }

    #[test]
    fn test_resizes_only_on_dimension_change() {
        let (mut renderer, calls) = renderer();
        renderer.begin_frame(640, 480);
        renderer.begin_frame(640, 480);
        renderer.begin_frame(1280, 720);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Resize(640, 480), Call::Resize(1280, 720)]
        );
    }

    #[test]
    fn test_render_draws_result() {
        let (mut renderer, calls) = renderer();
        let result = DetectionResult::new(ChannelId::Hands, 7, json!({}));
        renderer.render(ChannelId::Hands, Some(&result));

        assert_eq!(*calls.lock().unwrap(), vec![Call::Draw(ChannelId::Hands, 7)]);
    }

    #[test]
    fn test_render_absent_clears_layer() {
        let (mut renderer, calls) = renderer();
        renderer.render(ChannelId::Pose, None);

        assert_eq!(*calls.lock().unwrap(), vec![Call::Clear(ChannelId::Pose)]);
    }
}
