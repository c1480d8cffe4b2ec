/// Trust state of the configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    Unvalidated,
    Validating,
    Valid,
    Invalid,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Unvalidated => write!(f, "unvalidated"),
            EndpointStatus::Validating => write!(f, "validating"),
            EndpointStatus::Valid => write!(f, "valid"),
            EndpointStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// Endpoint base URL plus its current status. Written only by the
/// `EndpointValidator`; dispatchers read it at every send decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointState {
    pub url: String,
    pub status: EndpointStatus,
}

impl EndpointState {
    pub fn unvalidated() -> Self {
        Self {
            url: String::new(),
            status: EndpointStatus::Unvalidated,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == EndpointStatus::Valid
    }

    /// Full URL for a path on this endpoint, e.g. `route_url("/set_face")`.
    pub fn route_url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl Default for EndpointState {
    fn default() -> Self {
        Self::unvalidated()
    }
}
