use reqwest::StatusCode;
use thiserror::Error;

/// Classified failure of an outbound provider call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// 401 from the provider.
    #[error("{provider} authentication failed (invalid credentials or token)")]
    Unauthorized { provider: &'static str },

    /// 403 from the provider.
    #[error("{provider} access denied: {detail}")]
    Forbidden {
        provider: &'static str,
        detail: String,
    },

    /// 404 from the provider.
    #[error("{provider} resource not found: {resource}")]
    NotFound {
        provider: &'static str,
        resource: String,
    },

    /// Any other non-2xx status.
    #[error("{provider} API error: {status}")]
    Upstream { provider: &'static str, status: u16 },

    /// Connection, TLS or timeout failure before a status was received.
    #[error("{provider} connection error: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: TransportError,
    },

    /// Configured base URL cannot carry a request path.
    #[error("{provider} base URL is not usable for API requests")]
    InvalidUrl { provider: &'static str },

    /// 2xx response whose body did not match the expected shape.
    #[error("{provider} returned an unexpected response body")]
    Decode { provider: &'static str },
}

/// Redacted description of a reqwest transport failure.
///
/// reqwest errors can embed the request URL; only the failure class is kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("could not connect")]
    Connect,
    #[error("request failed")]
    Other,
}

impl ClientError {
    /// HTTP status reported by the provider, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Upstream { status, .. } => Some(*status),
            ClientError::Transport { .. }
            | ClientError::InvalidUrl { .. }
            | ClientError::Decode { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::Transport {
                source: TransportError::Timeout,
                ..
            }
        )
    }

    pub(crate) fn transport(provider: &'static str, err: &reqwest::Error) -> Self {
        let source = if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect
        } else {
            TransportError::Other
        };
        ClientError::Transport { provider, source }
    }
}

/// Map a non-success status to the matching error. `resource` names what
/// was requested (repo or project key) and is echoed in 404 messages.
pub(crate) fn classify_status(
    provider: &'static str,
    status: StatusCode,
    resource: &str,
) -> Result<(), ClientError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized { provider }),
        StatusCode::FORBIDDEN => Err(ClientError::Forbidden {
            provider,
            detail: format!("no permission to access {}", resource),
        }),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound {
            provider,
            resource: resource.to_string(),
        }),
        s => Err(ClientError::Upstream {
            provider,
            status: s.as_u16(),
        }),
    }
}
