//! The retransmission timer driving every in-flight exchange.

use std::time::{Duration, Instant};

/// Floor the backoff starts from.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(250);
/// Ceiling the backoff saturates at.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of an elapsed deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// The attempt budget is used up; the owner must give up rather
    /// than retransmit.
    pub exhausted: bool,
}

/// A passive retry timer with exponential backoff and a fixed expiry
/// budget.
///
/// The timer never calls back: the owner polls [`RetryTimer::deadline`]
/// and reports elapsed time through [`RetryTimer::expire`]. At most one
/// deadline is armed at a time.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    timeout: Duration,
    min: Duration,
    max: Duration,
    budget: u32,
    count: u32,
    deadline: Option<Instant>,
}

impl RetryTimer {
    #[must_use]
    pub fn new(budget: u32) -> RetryTimer {
        RetryTimer::with_backoff(MIN_TIMEOUT, MAX_TIMEOUT, budget)
    }

    #[must_use]
    pub fn with_backoff(min: Duration, max: Duration, budget: u32) -> RetryTimer {
        RetryTimer {
            timeout: min,
            min,
            max,
            budget,
            count: 0,
            deadline: None,
        }
    }

    /// Arms the timer with the current backoff delay. Does nothing if a
    /// deadline is already pending.
    pub fn start(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.timeout);
        }
    }

    /// Arms the timer to expire immediately.
    pub fn start_nodelay(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of deadlines that have elapsed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.count
    }

    /// Reports the passage of time. Returns `Some` exactly when an armed
    /// deadline has elapsed, disarming it and growing the backoff.
    pub fn expire(&mut self, now: Instant) -> Option<Expiry> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.count += 1;
        self.timeout = (self.timeout * 2).min(self.max).max(self.min);
        Some(Expiry {
            exhausted: self.count > self.budget,
        })
    }
}
