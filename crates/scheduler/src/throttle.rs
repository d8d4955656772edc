//! Minimum-interval rate limiter.

use std::time::{Duration, Instant};

/// Lets an action run at most once per `interval`.
///
/// Calls that arrive inside the interval are dropped, not queued.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_run: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether an action may run at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_run {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Claim the slot if ready. Returns `true` when the caller should run.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.last_run = Some(now);
            true
        } else {
            false
        }
    }

    /// Record a run that bypassed the limiter.
    pub fn mark(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}
