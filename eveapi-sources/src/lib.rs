// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # eveapi Sources
//!
//! Upstream clients and the killmail aggregation engine.
//!
//! ## Modules
//!
//! - [`zkill`] - zKillboard feed pages, single killmails and monthly aggregation
//! - [`esi`] - Typed ESI endpoints and station/structure resolution
//! - [`traits`] - The feed and detail seams the aggregator runs on
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use eveapi_core::EntityGroups;
//! use eveapi_fetch::RequestContext;
//! use eveapi_sources::{EsiService, KillmailAggregator, ZkillClient};
//!
//! let zkill = ZkillClient::new(ZKILL_BASE_URL, transport.clone(), cache.clone())?;
//! let esi = EsiService::new(Arc::new(executor));
//! let aggregator = KillmailAggregator::new(zkill, esi);
//!
//! let groups = EntityGroups::new().with_corporations([98_000_001]);
//! let records = aggregator
//!     .fetch_window(&RequestContext::new(), &groups, 2024, 5)
//!     .await?;
//! ```

pub mod esi;
pub mod traits;
pub mod zkill;

// Traits
pub use traits::{DetailSource, FeedSource};

// ESI
pub use esi::{CloneSystems, ESI_BASE_URL, EsiService, LocationResolver, SSO_VERIFY_URL};

/// The generic ESI request executor under its upstream-facing name.
pub use eveapi_fetch::RequestExecutor as EsiClient;

// zKillboard
pub use zkill::{
    AggregationReport, FailedFeed, KillmailAggregator, LONG_TTL, MAX_PAGES, SHORT_TTL,
    SkippedRecord, ZKILL_BASE_URL, ZkillClient, aggregate,
};
