//! Transport errors shared by the HTTP providers.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to a remote backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The bearer token was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected status or unparseable body.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Internal(format!("parse response: {}", e))
        } else {
            ProviderError::Connection(e.to_string())
        }
    }
}

/// Builds the shared HTTP client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Internal(format!("build http client: {}", e)))
}

/// Maps a non-success response to a [`ProviderError`].
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(format!("unauthorized: {}", body)),
        404 => ProviderError::NotFound(body),
        400 => ProviderError::InvalidRequest(body),
        429 => ProviderError::RateLimited { retry_after_secs },
        _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
    }
}
