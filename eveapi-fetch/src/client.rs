//! HTTP sender abstraction and its reqwest implementation.
//!
//! Everything above this module speaks [`HttpRequest`] / [`HttpResponse`],
//! plain owned values that can be replayed on retry and scripted in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Request / Response
// ============================================================================

/// An outbound request with a fully owned body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Adds a header, replacing any previous value.
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response without headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Check if the response indicates rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// Get the Retry-After header value in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Sender Trait
// ============================================================================

/// Performs a single HTTP round-trip.
///
/// Implementations must not retry; retrying is the transport's job.
#[async_trait]
pub trait HttpSender: Send + Sync {
    /// Sends `request` and buffers the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

// ============================================================================
// Reqwest Sender
// ============================================================================

/// [`HttpSender`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    inner: Client,
}

impl ReqwestSender {
    /// Creates a sender with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a sender with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { inner: client })
    }

    /// Wraps an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "Response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
