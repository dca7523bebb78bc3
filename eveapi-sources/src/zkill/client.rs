//! zKillboard API client.
//!
//! Feed pages go through the transport's backoff loop and are cached as the
//! raw upstream bytes. Pages of the running month expire after a day, older
//! months are treated as final.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eveapi_core::{
    CacheRepository, Direction, EntityKind, EntityReference, PageRequest, SummaryRecord,
    ZkillKillmail,
};
use eveapi_fetch::{FetchError, HttpRequest, RequestContext, Transport};
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::traits::FeedSource;

/// Default zKillboard base URL.
pub const ZKILL_BASE_URL: &str = "https://zkillboard.com";

/// TTL for closed months and single killmails.
pub const LONG_TTL: Duration = Duration::from_secs(770 * 60 * 60);

/// TTL for pages of the running month.
pub const SHORT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const SINGLE_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// Client
// ============================================================================

/// Client for the zKillboard JSON API.
pub struct ZkillClient {
    base_url: String,
    transport: Arc<Transport>,
    cache: Arc<dyn CacheRepository>,
    long_ttl: Duration,
    short_ttl: Duration,
}

impl ZkillClient {
    /// Creates a client for `base_url` (normally [`ZKILL_BASE_URL`]).
    pub fn new(
        base_url: &str,
        transport: Arc<Transport>,
        cache: Arc<dyn CacheRepository>,
    ) -> Result<Self, FetchError> {
        Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            cache,
            long_ttl: LONG_TTL,
            short_ttl: SHORT_TTL,
        })
    }

    /// Overrides the page TTLs.
    pub fn with_ttls(mut self, long: Duration, short: Duration) -> Self {
        self.long_ttl = long;
        self.short_ttl = short;
        self
    }

    /// Builds the cache key for one feed page,
    /// e.g. `zkill:kills:corporationID:9000000:2023:10:1`.
    pub fn build_cache_key(
        direction: Direction,
        kind: EntityKind,
        entity_id: i64,
        year: i32,
        month: u32,
        page: u32,
    ) -> String {
        PageRequest::new(EntityReference::new(kind, entity_id), direction, page, year, month)
            .cache_key()
    }

    /// Cache key for a single killmail.
    pub fn single_cache_key(killmail_id: i64) -> String {
        format!("zkill:single:killID:{killmail_id}")
    }

    /// Removes one cached entry.
    pub fn remove_cache_entry(&self, key: &str) {
        self.cache.delete(key);
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn request(url: Url) -> HttpRequest {
        HttpRequest::get(url).with_header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    async fn get_ok(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.transport.send(Self::request(url.clone())).await?;
        if response.status == 200 {
            Ok(response.body)
        } else {
            Err(FetchError::from_response(response))
        }
    }

    // ------------------------------------------------------------------------
    // Feed pages
    // ------------------------------------------------------------------------

    /// Killmails where the entity is on the attacker list.
    pub async fn kills_page(
        &self,
        ctx: &RequestContext,
        entity: EntityReference,
        page: u32,
        year: i32,
        month: u32,
    ) -> Result<Vec<SummaryRecord>, FetchError> {
        let request = PageRequest::new(entity, Direction::Kills, page, year, month);
        self.page(ctx, &request).await
    }

    /// Killmails where the entity is the victim.
    pub async fn losses_page(
        &self,
        ctx: &RequestContext,
        entity: EntityReference,
        page: u32,
        year: i32,
        month: u32,
    ) -> Result<Vec<SummaryRecord>, FetchError> {
        let request = PageRequest::new(entity, Direction::Losses, page, year, month);
        self.page(ctx, &request).await
    }

    /// Fetches one feed page, consulting the cache first.
    #[instrument(skip(self, ctx), fields(key = %request.cache_key()))]
    pub async fn page(
        &self,
        ctx: &RequestContext,
        request: &PageRequest,
    ) -> Result<Vec<SummaryRecord>, FetchError> {
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_slice(&cached) {
                Ok(records) => {
                    debug!("Cache hit");
                    return Ok(records);
                }
                Err(e) => debug!(error = %e, "Ignoring undecodable cache entry"),
            }
        }

        let url = self.url(&request.path())?;
        let url = &url;
        let body = self
            .transport
            .retry_with_backoff(ctx, || self.get_ok(url))
            .await?;
        let records: Vec<SummaryRecord> = serde_json::from_slice(&body)?;

        let ttl = if request.is_current_month(self.transport.clock().now()) {
            self.short_ttl
        } else {
            self.long_ttl
        };
        self.cache.set(&key, body, ttl);
        debug!(records = records.len(), "Fetched page");

        Ok(records)
    }

    // ------------------------------------------------------------------------
    // Single killmail
    // ------------------------------------------------------------------------

    /// Fetches one killmail from `api/killID/{id}/`.
    ///
    /// Runs its own loop of five attempts: a 429 waits for `Retry-After`
    /// when present, an undecodable or empty body is retried like any
    /// other failure. The last failure is returned when every attempt fails.
    #[instrument(skip(self, ctx))]
    pub async fn single_killmail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
    ) -> Result<ZkillKillmail, FetchError> {
        let key = Self::single_cache_key(killmail_id);

        if let Some(cached) = self.cache.get(&key) {
            if let Ok(mut kills) = serde_json::from_slice::<Vec<ZkillKillmail>>(&cached) {
                if !kills.is_empty() {
                    return Ok(kills.swap_remove(0));
                }
            }
        }

        let url = self.url(&format!("api/killID/{killmail_id}/"))?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.check(self.transport.clock().now())?;

            let err = match self.transport.send(Self::request(url.clone())).await {
                Ok(response) if response.status == 200 => {
                    match serde_json::from_slice::<Vec<ZkillKillmail>>(&response.body) {
                        Ok(mut kills) if !kills.is_empty() => {
                            self.cache.set(&key, response.body, self.long_ttl);
                            return Ok(kills.swap_remove(0));
                        }
                        Ok(_) => FetchError::EmptyResponse(format!(
                            "no killmail returned for killID={killmail_id}"
                        )),
                        Err(e) => FetchError::Json(e),
                    }
                }
                Ok(response) => FetchError::from_response(response),
                Err(e) => e,
            };

            if attempt >= SINGLE_MAX_ATTEMPTS {
                warn!(attempt, error = %err, "All attempts failed");
                return Err(err);
            }

            let wait = self.transport.backoff_for(&err, attempt);
            debug!(
                attempt,
                error = %err,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Retrying single killmail"
            );
            self.transport.clock().sleep(wait).await;
        }
    }
}

#[async_trait]
impl FeedSource for ZkillClient {
    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> Result<Vec<SummaryRecord>, FetchError> {
        self.page(ctx, page).await
    }
}

impl std::fmt::Debug for ZkillClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZkillClient")
            .field("base_url", &self.base_url)
            .field("long_ttl", &self.long_ttl)
            .field("short_ttl", &self.short_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eveapi_fetch::{HttpResponse, HttpSender, ManualClock};
    use chrono::{TimeZone, Utc};
    use reqwest::header::{HeaderMap, RETRY_AFTER};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedSender {
        responses: Mutex<VecDeque<HttpResponse>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedSender {
        fn push(&self, response: HttpResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpSender for ScriptedSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
            self.urls.lock().unwrap().push(request.url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| FetchError::EmptyResponse("script exhausted".to_string()))
        }
    }

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    }

    impl CacheRepository for MapCache {
        fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
        }

        fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
            self.entries.lock().unwrap().insert(key.to_string(), (value, ttl));
        }

        fn delete(&self, key: &str) {
            self.entries.lock().unwrap().remove(key);
        }
    }

    struct Fixture {
        sender: Arc<ScriptedSender>,
        cache: Arc<MapCache>,
        clock: Arc<ManualClock>,
        client: ZkillClient,
    }

    fn fixture() -> Fixture {
        let sender = Arc::new(ScriptedSender::default());
        let cache = Arc::new(MapCache::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        ));
        let transport = Transport::new(sender.clone(), "eveapi-test")
            .unwrap()
            .with_clock(clock.clone())
            .with_seed(11);
        let client =
            ZkillClient::new("https://zkb.example.com/", Arc::new(transport), cache.clone())
                .unwrap();
        Fixture {
            sender,
            cache,
            clock,
            client,
        }
    }

    const PAGE: &str = r#"[{"killmail_id": 10, "zkb": {"hash": "h10", "totalValue": 5.0}}]"#;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse::new(200, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_page_url_and_ttl_for_current_month() {
        let f = fixture();
        f.sender.push(ok(PAGE));

        let records = f
            .client
            .kills_page(&RequestContext::new(), EntityReference::corporation(98), 1, 2024, 6)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].zkb.hash, "h10");
        assert_eq!(
            f.sender.urls(),
            vec!["https://zkb.example.com/api/kills/corporationID/98/year/2024/month/6/page/1/"]
        );

        let entries = f.cache.entries.lock().unwrap();
        let (bytes, ttl) = entries.get("zkill:kills:corporationID:98:2024:06:1").unwrap();
        assert_eq!(bytes.as_slice(), PAGE.as_bytes());
        assert_eq!(*ttl, SHORT_TTL);
    }

    #[tokio::test]
    async fn test_past_month_uses_long_ttl_and_cache_hit_skips_network() {
        let f = fixture();
        f.sender.push(ok(PAGE));
        let ctx = RequestContext::new();

        f.client
            .losses_page(&ctx, EntityReference::alliance(7), 2, 2023, 10)
            .await
            .unwrap();
        let again = f
            .client
            .losses_page(&ctx, EntityReference::alliance(7), 2, 2023, 10)
            .await
            .unwrap();

        assert_eq!(again.len(), 1);
        assert_eq!(f.sender.urls().len(), 1);
        let key = ZkillClient::build_cache_key(Direction::Losses, EntityKind::Alliance, 7, 2023, 10, 2);
        assert_eq!(key, "zkill:losses:allianceID:7:2023:10:2");
        assert_eq!(f.cache.entries.lock().unwrap().get(&key).unwrap().1, LONG_TTL);

        f.client.remove_cache_entry(&key);
        assert!(f.cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn test_page_retries_5xx() {
        let f = fixture();
        f.sender.push(HttpResponse::new(503, b"down".to_vec()));
        f.sender.push(ok("[]"));

        let records = f
            .client
            .kills_page(&RequestContext::new(), EntityReference::character(1), 1, 2023, 1)
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(f.sender.urls().len(), 2);
        assert_eq!(f.clock.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_single_killmail_handles_429_and_empty_body() {
        let f = fixture();
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("4"));
        f.sender.push(HttpResponse::new(429, Vec::new()).with_headers(headers));
        f.sender.push(ok("[]"));
        f.sender.push(ok(
            r#"[{"killmail_id": 77, "solar_system_id": 30000142, "zkb": {"hash": "abc"}}]"#,
        ));

        let km = f
            .client
            .single_killmail(&RequestContext::new(), 77)
            .await
            .unwrap();

        assert_eq!(km.killmail_id, 77);
        assert_eq!(km.summary().zkb.hash, "abc");
        assert_eq!(f.sender.urls()[0], "https://zkb.example.com/api/killID/77/");

        let sleeps = f.clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert_eq!(sleeps[0], Duration::from_secs(4));
        assert!(sleeps[1] >= Duration::from_secs(2) && sleeps[1] < Duration::from_secs(4));

        assert!(f.cache.get(&ZkillClient::single_cache_key(77)).is_some());
    }

    #[tokio::test]
    async fn test_single_killmail_gives_up_after_five_attempts() {
        let f = fixture();
        for _ in 0..5 {
            f.sender.push(ok("not json"));
        }

        let err = f
            .client
            .single_killmail(&RequestContext::new(), 5)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Json(_)));
        assert_eq!(f.sender.urls().len(), 5);
        assert_eq!(f.clock.sleeps().len(), 4);
    }
}
