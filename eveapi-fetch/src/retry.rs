//! Backoff policy for retried requests.

use std::time::Duration;

use rand::Rng;

use crate::error::FetchError;

/// Statuses the backoff loop retries: 429 and the transient 5xx family.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Strategy for retrying failed requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for the un-jittered delay.
    pub max_delay: Duration,
    /// Whether to add uniform jitter in `[0, delay)`.
    pub jitter: bool,
}

impl RetryStrategy {
    /// Creates a strategy with `max_attempts` and the default 1s..32s curve.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            jitter: true,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Un-jittered delay after the given failed attempt (1-based).
    ///
    /// Doubles from `base_delay` and saturates at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay after `attempt` with jitter applied: `d + U[0, d)`.
    pub fn jittered_delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if !self.jitter || millis == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng.gen_range(0..millis))
    }

    /// Wait before retrying after `error` on `attempt`.
    ///
    /// A 429 with an integer `Retry-After` waits exactly that long.
    pub fn wait_for<R: Rng>(
        &self,
        error: &FetchError,
        attempt: u32,
        rng: &mut R,
    ) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.jittered_delay(attempt, rng))
    }

    /// Determines if an error should be retried.
    pub fn should_retry(&self, error: &FetchError) -> bool {
        error.is_retryable()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}
