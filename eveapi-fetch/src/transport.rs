//! Resilient transport: fixed User-Agent plus bounded exponential backoff.

use std::future::Future;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::header::{HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::client::{HttpRequest, HttpResponse, HttpSender};
use crate::clock::{Clock, SystemClock};
use crate::context::RequestContext;
use crate::error::FetchError;
use crate::retry::RetryStrategy;

/// Wraps an [`HttpSender`] with an identifying User-Agent and a retry loop.
///
/// The transport is shared by every client built on top of it; it holds no
/// per-request state apart from the jitter RNG.
pub struct Transport {
    sender: Arc<dyn HttpSender>,
    user_agent: HeaderValue,
    strategy: RetryStrategy,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl Transport {
    /// Creates a transport that stamps `user_agent` on every request.
    pub fn new(sender: Arc<dyn HttpSender>, user_agent: &str) -> Result<Self, FetchError> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| FetchError::InvalidRequest(format!("user agent: {e}")))?;
        Ok(Self {
            sender,
            user_agent,
            strategy: RetryStrategy::default(),
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replaces the retry strategy.
    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the clock used for sleeps and deadlines.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seeds the jitter RNG for reproducible schedules.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// The retry strategy in use.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// The clock in use.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Sends one request. The User-Agent header is always overwritten.
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, FetchError> {
        request.headers.insert(USER_AGENT, self.user_agent.clone());
        self.sender.send(request).await
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempt budget is spent.
    ///
    /// The context is checked before every attempt. The last error is
    /// returned unchanged.
    pub async fn retry_with_backoff<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        mut operation: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.strategy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.check(self.clock.now())?;

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts || !self.strategy.should_retry(&err) {
                if attempt > 1 {
                    debug!(attempt, error = %err, "Giving up");
                }
                return Err(err);
            }

            let wait = self.backoff_for(&err, attempt);
            warn!(
                attempt,
                status = ?err.status(),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Retryable failure, backing off"
            );
            self.clock.sleep(wait).await;
        }
    }

    /// Wait before the attempt following `attempt` failed with `err`.
    ///
    /// Uses the server's `Retry-After` for a 429, the jittered curve otherwise.
    pub fn backoff_for(&self, err: &FetchError, attempt: u32) -> std::time::Duration {
        match self.rng.lock() {
            Ok(mut rng) => self.strategy.wait_for(err, attempt, &mut *rng),
            Err(_) => err
                .retry_after()
                .unwrap_or_else(|| self.strategy.delay_for_attempt(attempt)),
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("user_agent", &self.user_agent)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
