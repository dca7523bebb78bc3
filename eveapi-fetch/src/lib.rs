// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # eveapi Fetch
//!
//! The resilient request pipeline shared by the ESI and zKillboard clients.
//!
//! ## Layers
//!
//! - [`client::HttpSender`] - One HTTP round-trip, reqwest-backed in production
//! - [`transport::Transport`] - Fixed User-Agent plus bounded exponential backoff
//! - [`executor::RequestExecutor`] - URL building, 401/403 refresh, GET caching
//!
//! ## Supporting types
//!
//! - [`retry::RetryStrategy`] - Attempt budget and the 1s..32s jittered curve
//! - [`clock::Clock`] - Time source; swap in [`clock::ManualClock`] for tests
//! - [`context::RequestContext`] - Cancellation flag and deadline
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use eveapi_fetch::{RequestContext, RequestExecutor, ReqwestSender, Transport};
//!
//! let sender = Arc::new(ReqwestSender::new()?);
//! let transport = Arc::new(Transport::new(sender, "my-app/1.0 (me@example.com)")?);
//! let esi = RequestExecutor::new("https://esi.evetech.net/latest/", transport, cache)?;
//!
//! let body = esi.get_bytes(&RequestContext::new(), "status/", None, &[]).await?;
//! ```

// Core modules
pub mod client;
pub mod clock;
pub mod context;
pub mod error;
pub mod executor;
pub mod retry;
pub mod transport;

// Re-export key types at crate root

// Errors
pub use error::FetchError;

// Sending
pub use client::{HttpRequest, HttpResponse, HttpSender, ReqwestSender};
pub use transport::Transport;

// Retry and time
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use retry::{RETRYABLE_STATUSES, RetryStrategy};

// Executor
pub use executor::{
    DEFAULT_CACHE_TTL, DEFAULT_DATASOURCE, MetricsSnapshot, RequestExecutor, RequestMetrics,
};
