//! Monthly killmail aggregation.
//!
//! Walks every entity's kills and losses feed page by page, enriches each
//! unseen summary with its ESI killmail and collects the merged records.
//! The run is strictly sequential: one page or detail fetch completes
//! before the next one starts.

use std::collections::HashSet;
use std::sync::Arc;

use eveapi_core::{
    Direction, EntityGroups, EntityReference, MergedRecord, PageRequest, SummaryRecord, merge,
};
use eveapi_fetch::{Clock, FetchError, RequestContext, SystemClock};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::traits::{DetailSource, FeedSource};

/// Highest page fetched per feed.
pub const MAX_PAGES: u32 = 100;

// ============================================================================
// Report
// ============================================================================

/// A summary whose detail could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Killmail id.
    pub killmail_id: i64,
    /// Error text.
    pub error: String,
}

/// A feed that stopped early because a page fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFeed {
    /// Feed owner.
    pub entity: EntityReference,
    /// Kills or losses.
    pub direction: Direction,
    /// Page that failed.
    pub page: u32,
    /// Error text.
    pub error: String,
}

/// Everything an aggregation run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    /// Merged records, one per distinct killmail id, in discovery order.
    pub records: Vec<MergedRecord>,
    /// Summaries dropped because their detail fetch failed.
    pub skipped: Vec<SkippedRecord>,
    /// Feeds cut short by a page error.
    pub failed_feeds: Vec<FailedFeed>,
    /// Number of page fetches issued.
    pub pages_fetched: u32,
    /// True if the run stopped early on cancellation or deadline.
    pub interrupted: bool,
}

impl AggregationReport {
    /// Returns true if nothing was skipped and no feed failed.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed_feeds.is_empty() && !self.interrupted
    }
}

fn is_interruption(err: &FetchError) -> bool {
    matches!(err, FetchError::Cancelled | FetchError::DeadlineExceeded)
}

// ============================================================================
// Aggregator
// ============================================================================

/// Fetches and merges killmails for a set of entities over one month.
pub struct KillmailAggregator<F, D> {
    feed: F,
    detail: D,
    clock: Arc<dyn Clock>,
    max_pages: u32,
}

impl<F: FeedSource, D: DetailSource> KillmailAggregator<F, D> {
    /// Creates an aggregator over a feed and a detail source.
    pub fn new(feed: F, detail: D) -> Self {
        Self {
            feed,
            detail,
            clock: Arc::new(SystemClock),
            max_pages: MAX_PAGES,
        }
    }

    /// Replaces the clock used for deadline checks between pages.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Lowers or raises the page ceiling.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// The feed source.
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// The detail source.
    pub fn detail(&self) -> &D {
        &self.detail
    }

    /// Fetches every merged killmail for `groups` in `(year, month)`.
    ///
    /// Failed pages and failed details are logged and skipped; use
    /// [`fetch_window_report`](Self::fetch_window_report) to inspect them.
    pub async fn fetch_window(
        &self,
        ctx: &RequestContext,
        groups: &EntityGroups,
        year: i32,
        month: u32,
    ) -> Result<Vec<MergedRecord>, FetchError> {
        Ok(self
            .fetch_window_report(ctx, groups, year, month)
            .await?
            .records)
    }

    /// Like [`fetch_window`](Self::fetch_window), returning what was skipped too.
    ///
    /// Cancellation or an expired deadline ends the run. With nothing
    /// collected yet that is an error, otherwise the partial report is
    /// returned with `interrupted` set.
    #[instrument(skip(self, ctx, groups), fields(entities = groups.len()))]
    pub async fn fetch_window_report(
        &self,
        ctx: &RequestContext,
        groups: &EntityGroups,
        year: i32,
        month: u32,
    ) -> Result<AggregationReport, FetchError> {
        let mut report = AggregationReport::default();
        let mut seen: HashSet<i64> = HashSet::new();

        'feeds: for entity in groups.iter() {
            for direction in Direction::both() {
                let mut request = PageRequest::new(entity, direction, 1, year, month);

                while request.page <= self.max_pages {
                    if let Err(err) = ctx.check(self.clock.now()) {
                        return Self::interrupted(report, err);
                    }

                    report.pages_fetched += 1;
                    let summaries = match self.feed.fetch_page(ctx, &request).await {
                        Ok(summaries) => summaries,
                        Err(err) if is_interruption(&err) => {
                            return Self::interrupted(report, err);
                        }
                        Err(err) => {
                            warn!(
                                entity = %entity,
                                direction = %direction,
                                page = request.page,
                                error = %err,
                                "Page fetch failed, ending feed"
                            );
                            report.failed_feeds.push(FailedFeed {
                                entity,
                                direction,
                                page: request.page,
                                error: err.to_string(),
                            });
                            break;
                        }
                    };

                    if summaries.is_empty() {
                        break;
                    }

                    if let Err(err) = self
                        .process_page(ctx, &summaries, &mut seen, &mut report)
                        .await
                    {
                        if report.records.is_empty() {
                            return Err(err);
                        }
                        report.interrupted = true;
                        break 'feeds;
                    }

                    request = request.next_page();
                }
            }
        }

        info!(
            records = report.records.len(),
            skipped = report.skipped.len(),
            failed_feeds = report.failed_feeds.len(),
            pages = report.pages_fetched,
            "Aggregation finished"
        );
        Ok(report)
    }

    fn interrupted(
        mut report: AggregationReport,
        err: FetchError,
    ) -> Result<AggregationReport, FetchError> {
        if report.records.is_empty() {
            return Err(err);
        }
        warn!(error = %err, records = report.records.len(), "Run interrupted, returning partial result");
        report.interrupted = true;
        Ok(report)
    }

    /// Enriches every unseen summary on a page. Only an interruption is an error.
    async fn process_page(
        &self,
        ctx: &RequestContext,
        summaries: &[SummaryRecord],
        seen: &mut HashSet<i64>,
        report: &mut AggregationReport,
    ) -> Result<(), FetchError> {
        for summary in summaries {
            if seen.contains(&summary.killmail_id) {
                debug!(killmail_id = summary.killmail_id, "Duplicate, skipping");
                continue;
            }

            match self.add_killmail(ctx, summary, &mut report.records).await {
                Ok(()) => {
                    seen.insert(summary.killmail_id);
                }
                Err(err) if is_interruption(&err) => return Err(err),
                Err(err) => {
                    warn!(
                        killmail_id = summary.killmail_id,
                        error = %err,
                        "Detail fetch failed, skipping killmail"
                    );
                    report.skipped.push(SkippedRecord {
                        killmail_id: summary.killmail_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fetches the detail for `summary`, merges it and appends it to `aggregated`.
    pub async fn add_killmail(
        &self,
        ctx: &RequestContext,
        summary: &SummaryRecord,
        aggregated: &mut Vec<MergedRecord>,
    ) -> Result<(), FetchError> {
        let detail = self
            .detail
            .fetch_detail(ctx, summary.killmail_id, &summary.zkb.hash)
            .await?;
        aggregated.push(merge(detail, summary));
        Ok(())
    }
}

/// Concatenates two result sets, `base` first.
pub fn aggregate(mut base: Vec<MergedRecord>, addition: Vec<MergedRecord>) -> Vec<MergedRecord> {
    if base.is_empty() {
        return addition;
    }
    base.extend(addition);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use eveapi_core::{DetailRecord, EntityKind, Victim, Zkb};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    // ------------------------------------------------------------------------
    // Mocks
    // ------------------------------------------------------------------------

    /// Serves pages from a map; anything not scripted is an empty page.
    #[derive(Default)]
    struct MapFeed {
        pages: HashMap<(EntityReference, Direction, u32), Vec<i64>>,
        failing: HashSet<(EntityReference, Direction, u32)>,
        calls: Mutex<Vec<PageRequest>>,
    }

    impl MapFeed {
        fn page(mut self, entity: EntityReference, direction: Direction, page: u32, ids: &[i64]) -> Self {
            self.pages.insert((entity, direction, page), ids.to_vec());
            self
        }

        fn fail(mut self, entity: EntityReference, direction: Direction, page: u32) -> Self {
            self.failing.insert((entity, direction, page));
            self
        }

        fn calls(&self) -> Vec<PageRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedSource for MapFeed {
        async fn fetch_page(
            &self,
            _ctx: &RequestContext,
            page: &PageRequest,
        ) -> Result<Vec<SummaryRecord>, FetchError> {
            self.calls.lock().unwrap().push(*page);
            let key = (page.entity, page.direction, page.page);
            if self.failing.contains(&key) {
                return Err(FetchError::Status {
                    status: 500,
                    body: b"boom".to_vec(),
                });
            }
            Ok(self
                .pages
                .get(&key)
                .map(|ids| ids.iter().map(|&id| summary(id)).collect())
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MapDetail {
        failing: HashSet<i64>,
        calls: Mutex<Vec<(i64, String)>>,
    }

    impl MapDetail {
        fn failing(ids: &[i64]) -> Self {
            Self {
                failing: ids.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(i64, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DetailSource for MapDetail {
        async fn fetch_detail(
            &self,
            _ctx: &RequestContext,
            killmail_id: i64,
            hash: &str,
        ) -> Result<DetailRecord, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((killmail_id, hash.to_string()));
            if self.failing.contains(&killmail_id) {
                return Err(FetchError::Status {
                    status: 422,
                    body: b"invalid killmail_id and/or killmail_hash".to_vec(),
                });
            }
            Ok(detail(killmail_id))
        }
    }

    /// Cancels the shared context after the first detail fetch.
    struct CancellingDetail {
        ctx: RequestContext,
    }

    #[async_trait]
    impl DetailSource for CancellingDetail {
        async fn fetch_detail(
            &self,
            _ctx: &RequestContext,
            killmail_id: i64,
            _hash: &str,
        ) -> Result<DetailRecord, FetchError> {
            self.ctx.cancel();
            Ok(detail(killmail_id))
        }
    }

    fn summary(id: i64) -> SummaryRecord {
        SummaryRecord {
            killmail_id: id,
            zkb: Zkb {
                hash: format!("hash-{id}"),
                total_value: id as f64,
                ..Zkb::default()
            },
        }
    }

    fn detail(id: i64) -> DetailRecord {
        DetailRecord {
            killmail_id: id,
            killmail_time: Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap(),
            solar_system_id: 30_000_000 + id,
            victim: Victim::default(),
            attackers: Vec::new(),
        }
    }

    fn ids(records: &[MergedRecord]) -> Vec<i64> {
        records.iter().map(|r| r.killmail_id).collect()
    }

    // ------------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pagination_stops_at_first_empty_page() {
        let corp = EntityReference::corporation(1);
        let feed = MapFeed::default()
            .page(corp, Direction::Kills, 1, &[11])
            .page(corp, Direction::Kills, 2, &[12])
            .page(corp, Direction::Kills, 3, &[13]);
        let agg = KillmailAggregator::new(feed, MapDetail::default());
        let groups = EntityGroups::new().with_corporations([1]);

        let records = agg
            .fetch_window(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&records), vec![11, 12, 13]);
        let kill_pages: Vec<u32> = agg
            .feed()
            .calls()
            .iter()
            .filter(|c| c.direction == Direction::Kills)
            .map(|c| c.page)
            .collect();
        assert_eq!(kill_pages, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let corp = EntityReference::corporation(1);
        let mut feed = MapFeed::default();
        for page in 1..=5 {
            feed = feed.page(corp, Direction::Kills, page, &[i64::from(page)]);
        }
        let agg = KillmailAggregator::new(feed, MapDetail::default()).with_max_pages(3);
        let groups = EntityGroups::new().with_corporations([1]);

        let report = agg
            .fetch_window_report(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&report.records), vec![1, 2, 3]);
        // 3 kill pages, 1 empty loss page
        assert_eq!(report.pages_fetched, 4);
    }

    #[tokio::test]
    async fn test_page_error_ends_only_that_feed() {
        let corp = EntityReference::corporation(1);
        let feed = MapFeed::default()
            .page(corp, Direction::Kills, 1, &[1])
            .fail(corp, Direction::Kills, 2)
            .page(corp, Direction::Losses, 1, &[2]);
        let agg = KillmailAggregator::new(feed, MapDetail::default());
        let groups = EntityGroups::new().with_corporations([1]);

        let report = agg
            .fetch_window_report(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&report.records), vec![1, 2]);
        assert_eq!(report.failed_feeds.len(), 1);
        assert_eq!(report.failed_feeds[0].page, 2);
        assert_eq!(report.failed_feeds[0].direction, Direction::Kills);
        assert!(!report.is_complete());
    }

    // ------------------------------------------------------------------------
    // Deduplication and merge
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dedup_across_feeds() {
        let corp = EntityReference::corporation(1);
        let character = EntityReference::character(3);
        let feed = MapFeed::default()
            .page(corp, Direction::Kills, 1, &[100, 101])
            .page(character, Direction::Losses, 1, &[101, 102]);
        let agg = KillmailAggregator::new(feed, MapDetail::default());
        let groups = EntityGroups::new().with_corporations([1]).with_characters([3]);

        let records = agg
            .fetch_window(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&records), vec![100, 101, 102]);
        assert_eq!(agg.detail().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_detail_uses_summary_hash_and_merges_values() {
        let corp = EntityReference::corporation(1);
        let feed = MapFeed::default().page(corp, Direction::Kills, 1, &[42]);
        let agg = KillmailAggregator::new(feed, MapDetail::default());
        let groups = EntityGroups::new().with_corporations([1]);

        let records = agg
            .fetch_window(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(agg.detail().calls(), vec![(42, "hash-42".to_string())]);
        assert_eq!(records[0].hash, "hash-42");
        assert_eq!(records[0].solar_system_id, 30_000_042);
        assert!((records[0].total_value - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_detail_is_skipped_and_retried_on_next_occurrence() {
        let corp = EntityReference::corporation(1);
        let alliance = EntityReference::alliance(2);
        let feed = MapFeed::default()
            .page(corp, Direction::Kills, 1, &[7, 8])
            .page(alliance, Direction::Kills, 1, &[7]);
        let agg = KillmailAggregator::new(feed, MapDetail::failing(&[7]));
        let groups = EntityGroups::new().with_corporations([1]).with_alliances([2]);

        let report = agg
            .fetch_window_report(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&report.records), vec![8]);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.killmail_id == 7));
        // id 7 was never marked seen, so the alliance feed asked again
        let asked_for_7 = agg.detail().calls().iter().filter(|(id, _)| *id == 7).count();
        assert_eq!(asked_for_7, 2);
    }

    #[tokio::test]
    async fn test_entity_order_and_direction_order() {
        let feed = MapFeed::default();
        let agg = KillmailAggregator::new(feed, MapDetail::default());
        let groups = EntityGroups::new()
            .with_characters([3])
            .with_alliances([2])
            .with_corporations([1]);

        agg.fetch_window(&RequestContext::new(), &groups, 2023, 10)
            .await
            .unwrap();

        let order: Vec<(EntityKind, Direction)> = agg
            .feed()
            .calls()
            .iter()
            .map(|c| (c.entity.kind, c.direction))
            .collect();
        assert_eq!(
            order,
            vec![
                (EntityKind::Corporation, Direction::Kills),
                (EntityKind::Corporation, Direction::Losses),
                (EntityKind::Alliance, Direction::Kills),
                (EntityKind::Alliance, Direction::Losses),
                (EntityKind::Character, Direction::Kills),
                (EntityKind::Character, Direction::Losses),
            ]
        );
    }

    // ------------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancelled_before_start_is_an_error() {
        let agg = KillmailAggregator::new(MapFeed::default(), MapDetail::default());
        let ctx = RequestContext::new();
        ctx.cancel();

        let result = agg
            .fetch_window(&ctx, &EntityGroups::new().with_corporations([1]), 2023, 10)
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(agg.feed().calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_midway_returns_partial_result() {
        let corp = EntityReference::corporation(1);
        let feed = MapFeed::default()
            .page(corp, Direction::Kills, 1, &[1])
            .page(corp, Direction::Kills, 2, &[2]);
        let ctx = RequestContext::new();
        let agg = KillmailAggregator::new(feed, CancellingDetail { ctx: ctx.clone() });
        let groups = EntityGroups::new().with_corporations([1]);

        let report = agg
            .fetch_window_report(&ctx, &groups, 2023, 10)
            .await
            .unwrap();

        assert_eq!(ids(&report.records), vec![1]);
        assert!(report.interrupted);
        assert_eq!(agg.feed().calls().len(), 1);
    }

    #[test]
    fn test_aggregate_concatenates() {
        let a = vec![merge(detail(1), &summary(1))];
        let b = vec![merge(detail(2), &summary(2))];

        assert_eq!(ids(&aggregate(a.clone(), b.clone())), vec![1, 2]);
        assert_eq!(ids(&aggregate(Vec::new(), b)), vec![2]);
        assert_eq!(ids(&aggregate(a, Vec::new())), vec![1]);
    }
}
