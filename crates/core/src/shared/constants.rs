use std::time::Duration;

/// Path probed on the endpoint base URL to confirm the display service.
pub const PAIR_PATH: &str = "/pair";

/// Field in the pairing response that identifies a mocap display service.
pub const PAIR_CONFIRMATION_FIELD: &str = "is_mocap";

/// Upper bound for any single probe or dispatch request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Length of the rolling throughput window.
pub const THROUGHPUT_WINDOW_MS: u64 = 1000;

/// Host refresh rate used when polling the active frame source.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
