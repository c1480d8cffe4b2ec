use crate::shared::channel_id::ChannelId;
use crate::shared::detection_result::DetectionResult;

/// Drawing capability the overlay renderer paints through.
///
/// Each channel owns an independent layer: drawing a channel replaces its
/// previous drawing, clearing it removes the layer.
pub trait DrawingSurface: Send {
    /// Resizes the surface to the frame dimensions, discarding all layers.
    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, channel: ChannelId, result: &DetectionResult);

    fn clear(&mut self, channel: ChannelId);

    /// Pushes buffered output to its destination. Default: no-op.
    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
