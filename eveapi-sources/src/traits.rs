//! Source traits consumed by the aggregation engine.
//!
//! The aggregator only needs "give me one feed page" and "give me one
//! killmail detail". Production wires the zKillboard client and the ESI
//! service in; tests script them.

use std::sync::Arc;

use async_trait::async_trait;
use eveapi_core::{DetailRecord, PageRequest, SummaryRecord};
use eveapi_fetch::{FetchError, RequestContext};

/// Produces one page of a killmail feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the summaries on `page`. An empty vector marks the end of the feed.
    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> Result<Vec<SummaryRecord>, FetchError>;
}

/// Produces the full killmail for a summary.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Fetches the killmail identified by `(killmail_id, hash)`.
    async fn fetch_detail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        hash: &str,
    ) -> Result<DetailRecord, FetchError>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> Result<Vec<SummaryRecord>, FetchError> {
        (**self).fetch_page(ctx, page).await
    }
}

#[async_trait]
impl<T: DetailSource + ?Sized> DetailSource for Arc<T> {
    async fn fetch_detail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        hash: &str,
    ) -> Result<DetailRecord, FetchError> {
        (**self).fetch_detail(ctx, killmail_id, hash).await
    }
}
