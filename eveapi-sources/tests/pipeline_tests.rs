//! End-to-end aggregation through the real transport, executor and clients.
//!
//! Only the network is replaced: a router answers by URL path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eveapi_core::{CacheRepository, EntityGroups};
use eveapi_fetch::{
    FetchError, HttpRequest, HttpResponse, HttpSender, ManualClock, RequestContext,
    RequestExecutor, Transport,
};
use eveapi_sources::{EsiService, KillmailAggregator, ZkillClient};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct Router {
    routes: Mutex<HashMap<String, (u16, String)>>,
    hits: Mutex<Vec<String>>,
}

impl Router {
    fn route(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    fn feed_hits(&self) -> usize {
        self.hits().iter().filter(|p| p.starts_with("/api/")).count()
    }
}

#[async_trait]
impl HttpSender for Router {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let path = request.url.path().to_string();
        self.hits.lock().unwrap().push(path.clone());
        let routed = self.routes.lock().unwrap().get(&path).cloned();
        let (status, body) = match routed {
            Some(found) => found,
            // unscripted feed pages are the empty end-of-feed page
            None if path.starts_with("/api/") => (200, "[]".to_string()),
            None => (404, r#"{"error":"not found"}"#.to_string()),
        };
        Ok(HttpResponse::new(status, body.into_bytes()))
    }
}

#[derive(Default)]
struct MapCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MapCache {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl CacheRepository for MapCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

struct Pipeline {
    router: Arc<Router>,
    cache: Arc<MapCache>,
    clock: Arc<ManualClock>,
    aggregator: KillmailAggregator<ZkillClient, EsiService>,
}

fn pipeline() -> Pipeline {
    let router = Arc::new(Router::default());
    let cache = Arc::new(MapCache::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    ));
    let transport = Arc::new(
        Transport::new(router.clone(), "eveapi-tests/0.1 (tests@example.com)")
            .unwrap()
            .with_clock(clock.clone())
            .with_seed(1),
    );
    let zkill = ZkillClient::new("https://zkb.example.com", transport.clone(), cache.clone()).unwrap();
    let executor =
        RequestExecutor::new("https://esi.example.com/latest/", transport, cache.clone()).unwrap();
    let esi = EsiService::new(Arc::new(executor));
    let aggregator = KillmailAggregator::new(zkill, esi).with_clock(clock.clone());

    Pipeline {
        router,
        cache,
        clock,
        aggregator,
    }
}

fn feed_page(id: i64) -> String {
    format!(
        r#"[{{"killmail_id": {id}, "zkb": {{"locationID": 40000001, "hash": "h{id}", "totalValue": {id}000.0, "points": 1, "npc": false, "solo": false, "awox": false}}}}]"#
    )
}

fn esi_killmail(id: i64) -> String {
    format!(
        r#"{{"killmail_id": {id}, "killmail_time": "2023-10-0{id}T10:00:00Z", "solar_system_id": 3000000{id},
            "victim": {{"ship_type_id": 587, "damage_taken": 10}}, "attackers": []}}"#
    )
}

fn script_full_window(router: &Router) {
    let feeds = [
        ("kills/corporationID/111", 1),
        ("losses/corporationID/111", 2),
        ("kills/allianceID/222", 3),
        ("losses/allianceID/222", 4),
        ("kills/characterID/333", 5),
        ("losses/characterID/333", 6),
    ];
    for (feed, id) in feeds {
        router.route(
            &format!("/api/{feed}/year/2023/month/10/page/1/"),
            200,
            feed_page(id),
        );
        router.route(
            &format!("/latest/killmails/{id}/h{id}/"),
            200,
            esi_killmail(id),
        );
    }
}

fn groups() -> EntityGroups {
    EntityGroups::new()
        .with_characters([333])
        .with_alliances([222])
        .with_corporations([111])
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_window_merges_one_record_per_feed() {
    let p = pipeline();
    script_full_window(&p.router);

    let records = p
        .aggregator
        .fetch_window(&RequestContext::new(), &groups(), 2023, 10)
        .await
        .unwrap();

    let ids: Vec<i64> = records.iter().map(|r| r.killmail_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(p.router.feed_hits(), 12);

    let third = &records[2];
    assert_eq!(third.hash, "h3");
    assert_eq!(third.solar_system_id, 30_000_003);
    assert!((third.total_value - 3000.0).abs() < f64::EPSILON);
    assert_eq!(third.location_id, 40_000_001);
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let p = pipeline();
    script_full_window(&p.router);
    let ctx = RequestContext::new();

    let first = p
        .aggregator
        .fetch_window(&ctx, &groups(), 2023, 10)
        .await
        .unwrap();
    let network_calls = p.router.hits().len();
    let second = p
        .aggregator
        .fetch_window(&ctx, &groups(), 2023, 10)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(p.router.hits().len(), network_calls);
    let keys = p.cache.keys();
    assert!(keys.contains(&"zkill:kills:corporationID:111:2023:10:1".to_string()));
    assert!(keys.contains(&"esi:killmails/1/h1/:&datasource=tranquility".to_string()));
}

#[tokio::test]
async fn test_missing_detail_is_skipped() {
    let p = pipeline();
    script_full_window(&p.router);
    p.router.route("/latest/killmails/4/h4/", 422, r#"{"error":"Invalid killmail_id and/or killmail_hash"}"#);

    let report = p
        .aggregator
        .fetch_window_report(&RequestContext::new(), &groups(), 2023, 10)
        .await
        .unwrap();

    let ids: Vec<i64> = report.records.iter().map(|r| r.killmail_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 5, 6]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].killmail_id, 4);
    assert_eq!(report.pages_fetched, 12);
}

#[tokio::test]
async fn test_transient_feed_failure_is_retried() {
    let p = pipeline();
    script_full_window(&p.router);
    let flaky = "/api/kills/corporationID/111/year/2023/month/10/page/1/";
    p.router.route(flaky, 503, "upstream busy");

    // the router keeps answering 503, so the feed is abandoned after five attempts
    let report = p
        .aggregator
        .fetch_window_report(&RequestContext::new(), &groups(), 2023, 10)
        .await
        .unwrap();

    let attempts = p.router.hits().iter().filter(|h| h.as_str() == flaky).count();
    assert_eq!(attempts, 5);
    assert_eq!(p.clock.sleeps().len(), 4);
    assert_eq!(report.failed_feeds.len(), 1);
    assert_eq!(report.records.len(), 5);
}
