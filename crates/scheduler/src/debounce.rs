//! Trailing-edge debouncer that coalesces rapid updates.

use std::time::{Duration, Instant};

/// Holds the most recent value until no new value has arrived for `quiet`.
///
/// # Example
///
/// ```
/// use pageview_scheduler::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let mut zoom = Debouncer::new(Duration::from_millis(150));
/// let t0 = Instant::now();
/// zoom.push(1.2_f32, t0);
/// zoom.push(1.5_f32, t0 + Duration::from_millis(50));
///
/// assert_eq!(zoom.poll(t0 + Duration::from_millis(100)), None);
/// assert_eq!(zoom.poll(t0 + Duration::from_millis(200)), Some(1.5));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value will settle.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.quiet)
    }

    /// Take the value once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Take the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
