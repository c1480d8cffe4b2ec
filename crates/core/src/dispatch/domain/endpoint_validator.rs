use serde_json::Value;

use super::endpoint_client::EndpointError;
use super::endpoint_state::{EndpointState, EndpointStatus};
use crate::shared::constants::{PAIR_CONFIRMATION_FIELD, PAIR_PATH};

/// A pairing probe the host must execute and report back.
///
/// `generation` ties the outcome to the URL it was issued for; outcomes of
/// superseded probes are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub generation: u64,
    pub url: String,
}

/// Owns the endpoint URL and drives its trust state machine:
/// `Unvalidated -> Validating -> {Valid, Invalid}`, back to `Validating`
/// on every URL change.
#[derive(Debug)]
pub struct EndpointValidator {
    state: EndpointState,
    generation: u64,
}

impl EndpointValidator {
    pub fn new() -> Self {
        Self {
            state: EndpointState::unvalidated(),
            generation: 0,
        }
    }

    pub fn state(&self) -> &EndpointState {
        &self.state
    }

    /// Points the validator at a new base URL and returns the probe to run.
    ///
    /// A URL that cannot be probed at all (empty, unparseable, non-HTTP)
    /// goes straight to `Invalid` and yields no probe.
    pub fn set_url(&mut self, url: &str) -> Option<ProbeRequest> {
        self.generation += 1;
        match normalize_base_url(url) {
            Ok(base) => {
                log::info!("Validating endpoint {base}");
                self.state = EndpointState {
                    url: base,
                    status: EndpointStatus::Validating,
                };
                Some(ProbeRequest {
                    generation: self.generation,
                    url: self.state.route_url(PAIR_PATH),
                })
            }
            Err(e) => {
                log::warn!("Endpoint rejected: {e}");
                self.state = EndpointState {
                    url: url.trim().to_string(),
                    status: EndpointStatus::Invalid,
                };
                None
            }
        }
    }

    /// Applies a probe outcome. Returns `false` if the probe was stale.
    pub fn on_probe_finished(
        &mut self,
        generation: u64,
        outcome: Result<Value, EndpointError>,
    ) -> bool {
        if generation != self.generation || self.state.status != EndpointStatus::Validating {
            log::debug!("Ignoring stale endpoint probe (generation {generation})");
            return false;
        }

        let probe_url = self.state.route_url(PAIR_PATH);
        match outcome.and_then(|body| confirm_pairing(&probe_url, &body)) {
            Ok(()) => {
                log::info!("Endpoint {} is valid", self.state.url);
                self.state.status = EndpointStatus::Valid;
            }
            Err(e) => {
                log::warn!("Endpoint {} is invalid: {e}", self.state.url);
                self.state.status = EndpointStatus::Invalid;
            }
        }
        true
    }
}

impl Default for EndpointValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims whitespace and trailing slashes and checks for an http(s) URL.
pub fn normalize_base_url(url: &str) -> Result<String, EndpointError> {
    let trimmed = url.trim().trim_end_matches('/');
    let invalid = |reason: &str| EndpointError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    Ok(trimmed.to_string())
}

/// Checks the pairing response for a truthy confirmation field.
pub fn confirm_pairing(url: &str, body: &Value) -> Result<(), EndpointError> {
    if !body.is_object() {
        return Err(EndpointError::MalformedResponse {
            url: url.to_string(),
            message: "expected a JSON object".to_string(),
        });
    }
    match body.get(PAIR_CONFIRMATION_FIELD) {
        Some(value) if is_truthy(value) => Ok(()),
        _ => Err(EndpointError::NotMocap {
            url: url.to_string(),
        }),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
