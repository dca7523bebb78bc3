//! zKillboard feeds and monthly aggregation.

mod aggregate;
mod client;

pub use aggregate::{
    AggregationReport, FailedFeed, KillmailAggregator, MAX_PAGES, SkippedRecord, aggregate,
};
pub use client::{LONG_TTL, SHORT_TTL, ZKILL_BASE_URL, ZkillClient};
