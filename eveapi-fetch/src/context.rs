//! Per-request context carrying cancellation and a deadline.
//!
//! The context is passed to every executor, source and aggregator call.
//! It is checked before each attempt of a retry loop and between pages of
//! an aggregation run; an in-flight round-trip is never interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::error::FetchError;

// ============================================================================
// Request Context
// ============================================================================

/// Cancellation flag and optional deadline shared by one logical request.
///
/// Clones share the same flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<DateTime<Utc>>,
}

impl RequestContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Signals cancellation to every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails if the context was cancelled or its deadline is at or before `now`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), FetchError> {
        if self.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if now >= deadline => Err(FetchError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        let now = Utc::now();

        assert!(clone.check(now).is_ok());
        ctx.cancel();
        assert!(matches!(clone.check(now), Err(FetchError::Cancelled)));
    }

    #[test]
    fn test_deadline() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ctx = RequestContext::new().with_deadline(deadline);

        assert!(ctx.check(deadline - Duration::seconds(1)).is_ok());
        assert!(matches!(
            ctx.check(deadline),
            Err(FetchError::DeadlineExceeded)
        ));
    }
}
