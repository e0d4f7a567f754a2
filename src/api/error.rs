use reqwest::StatusCode;
use thiserror::Error;

use super::types::ApiErrorBody;

/// Error type for DigitalOcean API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: DNS, TLS, connection refused, timeout.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("DigitalOcean API returned {status}: {message}")]
    Status {
        status: StatusCode,
        id: Option<String>,
        message: String,
    },

    #[error("Failed to decode {context} response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Rejected locally, no request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for DigitalOcean API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a non-2xx response body.
    ///
    /// DigitalOcean error bodies look like `{"id": "not_found", "message": "..."}`.
    /// Anything else falls back to the raw body text.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();

        let message = match parsed.message {
            Some(message) if !message.is_empty() => message,
            _ => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    text
                }
            }
        };

        ApiError::Status {
            status,
            id: parsed.id,
            message,
        }
    }

    /// HTTP status for errors that came back from the API.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status(),
            ApiError::Decode { .. } | ApiError::InvalidArgument(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
