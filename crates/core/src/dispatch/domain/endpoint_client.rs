use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
    #[error("{url} is not a mocap display service")]
    NotMocap { url: String },
}

/// HTTP capability used for endpoint probing and result dispatch.
///
/// Calls block their worker thread; the event loop never calls them directly.
pub trait EndpointClient: Send + Sync {
    /// `GET {url}` and parse the response body as JSON.
    fn get_json(&self, url: &str) -> Result<Value, EndpointError>;

    /// `POST {url}` with a JSON body. Any 2xx response is success.
    fn post_json(&self, url: &str, body: &Value) -> Result<(), EndpointError>;
}
