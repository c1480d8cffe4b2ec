/// A single captured frame: contiguous RGB bytes in row-major order plus the
/// monotonic capture timestamp of the source.
///
/// Frames are immutable once captured. The pipeline shares them read-only
/// (behind an `Arc`) with detector workers for one tick and then drops them.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    captured_at_ms: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, captured_at_ms: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            captured_at_ms,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn captured_at_ms(&self) -> u64 {
        self.captured_at_ms
    }
}
