//! Fetch error types.

use std::time::Duration;

use eveapi_core::CoreError;
use thiserror::Error;

use crate::client::HttpResponse;
use crate::retry::RETRYABLE_STATUSES;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for transport, executor and source operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a status outside the expected set.
    #[error("unexpected status code: {status}, body: {}", String::from_utf8_lossy(.body))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: Vec<u8>,
    },

    /// Rate limited by the upstream (HTTP 429).
    #[error("rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, from `Retry-After`.
        retry_after: Option<u64>,
        /// Raw response body.
        body: Vec<u8>,
    },

    /// The credential refresher rejected the refresh token.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] CoreError),

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request could not be built (bad header value, bad argument).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered 200 with nothing usable.
    #[error("empty response: {0}")]
    EmptyResponse(String),

    /// The request context was cancelled before the next attempt.
    #[error("request cancelled")]
    Cancelled,

    /// The request context deadline passed before the next attempt.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl FetchError {
    /// Builds the error for a response whose status was not expected.
    pub fn from_response(response: HttpResponse) -> Self {
        if response.status == 429 {
            Self::RateLimited {
                retry_after: response.retry_after_secs(),
                body: response.body,
            }
        } else {
            Self::Status {
                status: response.status,
                body: response.body,
            }
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns the raw response body carried by this error, if any.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Status { body, .. } | Self::RateLimited { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns true if the backoff loop should try again.
    pub fn is_retryable(&self) -> bool {
        self.status()
            .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
    }

    /// Returns true for HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true for HTTP 401 and 403.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Server-requested wait for a 429, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}
