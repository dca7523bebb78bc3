//! Credential-aware request executor.
//!
//! The executor builds URLs against a base, sends through the shared
//! [`Transport`], swaps in a refreshed credential after a 401/403, and caches
//! successful GET bodies under a key derived from the endpoint and its
//! sorted query parameters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eveapi_core::{CacheRepository, Credential, CredentialRefresher};
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use crate::client::{HttpRequest, HttpResponse};
use crate::context::RequestContext;
use crate::error::FetchError;
use crate::transport::Transport;

/// TTL for cached GET bodies unless a caller overrides it.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(770 * 60 * 60);

/// Datasource parameter added to every GET that does not set one.
pub const DEFAULT_DATASOURCE: &str = "tranquility";

const STATUS_OK: &[u16] = &[200];

// ============================================================================
// Metrics
// ============================================================================

/// Outcome counters for one executor.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    total: AtomicU64,
    success: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
}

impl RequestMetrics {
    fn record(&self, status: u16) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            404 => &self.not_found,
            200..=299 => &self.success,
            _ => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests that produced a final status.
    pub total: u64,
    /// 2xx responses.
    pub success: u64,
    /// 404 responses.
    pub not_found: u64,
    /// Everything else.
    pub failed: u64,
}

// ============================================================================
// Request Executor
// ============================================================================

/// Executes requests against one base URL.
pub struct RequestExecutor {
    base_url: Url,
    transport: Arc<Transport>,
    cache: Arc<dyn CacheRepository>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    cache_ttl: Duration,
    metrics: RequestMetrics,
}

impl RequestExecutor {
    /// Creates an executor for `base_url`.
    ///
    /// A trailing slash is added to the base so relative endpoints append
    /// to its path instead of replacing the last segment.
    pub fn new(
        base_url: &str,
        transport: Arc<Transport>,
        cache: Arc<dyn CacheRepository>,
    ) -> Result<Self, FetchError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;

        Ok(Self {
            base_url,
            transport,
            cache,
            refresher: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            metrics: RequestMetrics::default(),
        })
    }

    /// Enables refresh-and-retry on 401/403.
    pub fn with_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Overrides the default GET cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// The base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The shared transport.
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// The cache backend.
    pub fn cache(&self) -> &Arc<dyn CacheRepository> {
        &self.cache
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ------------------------------------------------------------------------
    // URL and cache key
    // ------------------------------------------------------------------------

    /// Joins `endpoint` onto the base URL and appends `params` in key order.
    pub fn build_url(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl(format!("{endpoint}: {e}")))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Cache key for a GET: `esi:<endpoint>:&k1=v1&k2=v2`, keys sorted.
    pub fn build_cache_key(endpoint: &str, params: &BTreeMap<String, String>) -> String {
        let query: String = params
            .iter()
            .map(|(key, value)| format!("&{key}={value}"))
            .collect();
        format!("esi:{endpoint}:{query}")
    }

    /// Collects `params` by key and adds the default datasource if absent.
    pub fn normalize_params(params: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        map.entry("datasource".to_string())
            .or_insert_with(|| DEFAULT_DATASOURCE.to_string());
        map
    }

    // ------------------------------------------------------------------------
    // Core request
    // ------------------------------------------------------------------------

    /// Sends one request, refreshing the credential once on 401/403.
    ///
    /// `expected` lists the accepted statuses; an empty slice means `[200]`.
    /// Any other status becomes [`FetchError::Status`] (or
    /// [`FetchError::RateLimited`] for 429) carrying the raw body.
    ///
    /// The refreshed credential is used for the one retry and then dropped;
    /// persisting it is the refresher's job. Calling `execute` again with
    /// the old credential refreshes again. The GET helpers keep the
    /// refreshed credential for their later backoff attempts.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &Url,
        credential: Option<&Credential>,
        body: Option<&[u8]>,
        expected: &[u16],
    ) -> Result<Vec<u8>, FetchError> {
        self.exchange(ctx, method, url, credential, body, expected)
            .await
            .0
    }

    /// [`execute`](Self::execute), also returning the credential obtained
    /// from a refresh, if one happened.
    #[instrument(skip(self, ctx, credential, body), fields(method = %method, url = %url))]
    async fn exchange(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &Url,
        credential: Option<&Credential>,
        body: Option<&[u8]>,
        expected: &[u16],
    ) -> (Result<Vec<u8>, FetchError>, Option<Credential>) {
        if let Err(e) = ctx.check(self.transport.clock().now()) {
            return (Err(e), None);
        }
        let expected = if expected.is_empty() { STATUS_OK } else { expected };

        let mut response = match self.send_once(&method, url, credential, body).await {
            Ok(response) => response,
            Err(e) => return (Err(e), None),
        };

        let refreshed = match self.refresh_for(response.status, credential).await {
            Ok(refreshed) => refreshed,
            Err(e) => return (Err(e), None),
        };
        if let Some(fresh) = &refreshed {
            info!(status = response.status, "Credential refreshed, retrying once");
            response = match self.send_once(&method, url, Some(fresh), body).await {
                Ok(response) => response,
                Err(e) => return (Err(e), Some(fresh.clone())),
            };
        }

        self.metrics.record(response.status);

        let result = if expected.contains(&response.status) {
            Ok(response.body)
        } else {
            debug!(status = response.status, "Unexpected status");
            Err(FetchError::from_response(response))
        };
        (result, refreshed)
    }

    /// A fresh credential when `status` is 401/403 and the credential can
    /// be refreshed; `None` when no refresh applies.
    async fn refresh_for(
        &self,
        status: u16,
        credential: Option<&Credential>,
    ) -> Result<Option<Credential>, FetchError> {
        if !matches!(status, 401 | 403) {
            return Ok(None);
        }
        let (Some(cred), Some(refresher)) = (credential, &self.refresher) else {
            return Ok(None);
        };
        if !cred.can_refresh() {
            return Ok(None);
        }
        let token = cred.refresh_token.as_deref().unwrap_or_default();
        let fresh = refresher
            .refresh(token)
            .await
            .map_err(FetchError::RefreshFailed)?;
        Ok(Some(fresh))
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        credential: Option<&Credential>,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, FetchError> {
        let json = HeaderValue::from_static("application/json");
        let mut request = HttpRequest::new(method.clone(), url.clone())
            .with_header(ACCEPT, json.clone())
            .with_header(CONTENT_TYPE, json);

        if let Some(cred) = credential.filter(|c| !c.access_token.is_empty()) {
            let value = HeaderValue::from_str(&cred.bearer())
                .map_err(|e| FetchError::InvalidRequest(format!("authorization header: {e}")))?;
            request = request.with_header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.with_body(body.to_vec());
        }

        self.transport.send(request).await
    }

    // ------------------------------------------------------------------------
    // Convenience methods
    // ------------------------------------------------------------------------

    /// Cached GET returning the raw body.
    pub async fn get_bytes(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        params: &[(&str, &str)],
    ) -> Result<Vec<u8>, FetchError> {
        self.get_bytes_with_ttl(ctx, endpoint, credential, params, None)
            .await
    }

    /// Cached GET with an explicit TTL for a fresh write.
    #[instrument(skip(self, ctx, credential, params))]
    pub async fn get_bytes_with_ttl(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        params: &[(&str, &str)],
        ttl: Option<Duration>,
    ) -> Result<Vec<u8>, FetchError> {
        let params = Self::normalize_params(params);
        let key = Self::build_cache_key(endpoint, &params);

        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let url = self.build_url(endpoint, &params)?;
        let data = self.get_with_backoff(ctx, &url, credential).await?;

        self.cache
            .set(&key, data.clone(), ttl.unwrap_or(self.cache_ttl));
        Ok(data)
    }

    /// GET that always goes to the network and never reads or writes the
    /// cache. For authenticated reads that change between calls.
    pub async fn get_fresh_bytes(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        params: &[(&str, &str)],
    ) -> Result<Vec<u8>, FetchError> {
        let params = Self::normalize_params(params);
        let url = self.build_url(endpoint, &params)?;
        self.get_with_backoff(ctx, &url, credential).await
    }

    /// Uncached GET decoded from JSON.
    pub async fn get_fresh_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let data = self.get_fresh_bytes(ctx, endpoint, credential, params).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// GET under the backoff loop. A credential refreshed on one attempt
    /// is used by every later attempt.
    async fn get_with_backoff(
        &self,
        ctx: &RequestContext,
        url: &Url,
        credential: Option<&Credential>,
    ) -> Result<Vec<u8>, FetchError> {
        let current = Mutex::new(credential.cloned());
        let current = &current;

        self.transport
            .retry_with_backoff(ctx, move || async move {
                let cred = current.lock().ok().and_then(|c| c.clone());
                let (result, refreshed) = self
                    .exchange(ctx, Method::GET, url, cred.as_ref(), None, STATUS_OK)
                    .await;
                if let Some(fresh) = refreshed {
                    if let Ok(mut slot) = current.lock() {
                        *slot = Some(fresh);
                    }
                }
                result
            })
            .await
    }

    /// Cached GET decoded from JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let data = self.get_bytes(ctx, endpoint, credential, params).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// POST without caching or backoff.
    pub async fn post(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        body: Option<&[u8]>,
        expected: &[u16],
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.build_url(endpoint, &BTreeMap::new())?;
        self.execute(ctx, Method::POST, &url, credential, body, expected)
            .await
    }

    /// DELETE without caching or backoff.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
        body: Option<&[u8]>,
        expected: &[u16],
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.build_url(endpoint, &BTreeMap::new())?;
        self.execute(ctx, Method::DELETE, &url, credential, body, expected)
            .await
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url.as_str())
            .field("cache_ttl", &self.cache_ttl)
            .field("refresher", &self.refresher.is_some())
            .finish_non_exhaustive()
    }
}
