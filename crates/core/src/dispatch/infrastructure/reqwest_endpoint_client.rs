use std::time::Duration;

use serde_json::Value;

use crate::dispatch::domain::endpoint_client::{EndpointClient, EndpointError};

/// Blocking HTTP client for the display service.
///
/// Every request carries the configured timeout, so a hung connection ends
/// as a transport failure instead of pinning a channel's in-flight slot.
pub struct ReqwestEndpointClient {
    client: reqwest::blocking::Client,
}

impl ReqwestEndpointClient {
    pub fn new(timeout: Duration) -> Result<Self, EndpointError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EndpointError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn transport(url: &str, e: reqwest::Error) -> EndpointError {
    EndpointError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    }
}

impl EndpointClient for ReqwestEndpointClient {
    fn get_json(&self, url: &str) -> Result<Value, EndpointError> {
        let response = self.client.get(url).send().map_err(|e| transport(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .map_err(|e| EndpointError::MalformedResponse {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<(), EndpointError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| transport(url, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if let Ok(details) = response.text() {
            log::debug!("Error details from {url}: {details}");
        }
        Err(EndpointError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
