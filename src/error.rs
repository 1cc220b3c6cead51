use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use provider_clients::ClientError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by integration operations.
///
/// Every message is safe to show to the caller: none of them carry token
/// plaintext, ciphertext or key material.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Caller may not manage the group.
    #[error("{0}")]
    Forbidden(String),

    /// No configuration row for (group, provider).
    #[error("{0}")]
    NotFound(String),

    /// Concurrent create for the same (group, provider). Safe to retry.
    #[error("{0}")]
    Conflict(String),

    /// Provider answered with a non-2xx status or could not be reached.
    #[error(transparent)]
    Upstream(ClientError),

    /// Provider call exceeded the configured timeout.
    #[error("{0} did not respond in time")]
    UpstreamTimeout(&'static str),

    /// An operation needed the secret and could not recover it.
    #[error("{0}")]
    Internal(String),

    /// Database failure. Details are logged, not returned.
    #[error("Storage error")]
    Storage(#[from] anyhow::Error),
}

/// Result type alias using IntegrationError
pub type IntegrationResult<T> = Result<T, IntegrationError>;

impl IntegrationError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(e) => match e.status() {
                Some(401) => StatusCode::UNAUTHORIZED,
                Some(403) => StatusCode::FORBIDDEN,
                Some(404) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClientError> for IntegrationError {
    fn from(e: ClientError) -> Self {
        if e.is_timeout() {
            let provider = match e {
                ClientError::Transport { provider, .. } => provider,
                _ => "provider",
            };
            return Self::UpstreamTimeout(provider);
        }
        if let ClientError::InvalidUrl { .. } = e {
            return Self::Validation(e.to_string());
        }
        Self::Upstream(e)
    }
}

/// Unreadable request bodies are validation failures. The serde detail is
/// dropped since it can echo submitted values.
impl From<JsonRejection> for IntegrationError {
    fn from(rejection: JsonRejection) -> Self {
        let msg = match rejection {
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::JsonDataError(_) => "Request body has a field of the wrong type",
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`"
            }
            _ => "Request body could not be read",
        };
        Self::validation(msg)
    }
}

/// Error body returned by the HTTP API
#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for IntegrationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Storage(e) = &self {
            error!(error = %e, "Integration storage failure");
        }

        let body = Json(ErrorResponse {
            status: status.as_u16(),
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
