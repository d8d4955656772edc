//! Time-ordered queue of deferred tasks
//!
//! Used for work that should run a fixed delay after it was requested, such as
//! capturing a snapshot shortly after a page finishes rendering. Tasks that
//! share a due time run in the order they were scheduled.

use std::time::Instant;

#[derive(Debug, Clone)]
struct Entry<T> {
    due: Instant,
    seq: u64,
    task: T,
}

/// Deferred task queue keyed by due time
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    entries: Vec<Entry<T>>,
    next_seq: u64,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new(), next_seq: 0 }
    }

    /// Schedule `task` to become due at `due`.
    pub fn schedule(&mut self, task: T, due: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;

        // keep sorted by (due, seq) so draining is a prefix split
        let at = self.entries.partition_point(|e| (e.due, e.seq) <= (due, seq));
        self.entries.insert(at, Entry { due, seq, task });
    }

    /// Remove and return every task due at or before `now`, oldest first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let split = self.entries.partition_point(|e| e.due <= now);
        self.entries.drain(..split).map(|e| e.task).collect()
    }

    /// Earliest due time, if anything is queued.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.due)
    }

    /// Remove and return every task matching `pick`, due or not, oldest first.
    pub fn take_where(&mut self, mut pick: impl FnMut(&T) -> bool) -> Vec<T> {
        let (taken, kept): (Vec<Entry<T>>, Vec<Entry<T>>) =
            std::mem::take(&mut self.entries).into_iter().partition(|e| pick(&e.task));
        self.entries = kept;
        taken.into_iter().map(|e| e.task).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn drains_only_due_tasks_in_order() {
        let mut queue = DeferredQueue::new();
        let t0 = Instant::now();
        queue.schedule("late", t0 + Duration::from_millis(300));
        queue.schedule("first", t0 + Duration::from_millis(100));
        queue.schedule("second", t0 + Duration::from_millis(100));

        assert!(queue.drain_due(t0).is_empty());
        assert_eq!(queue.next_deadline(), Some(t0 + Duration::from_millis(100)));
        assert_eq!(queue.drain_due(t0 + Duration::from_millis(150)), vec!["first", "second"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(t0 + Duration::from_secs(1)), vec!["late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn take_where_pulls_tasks_ahead_of_time() {
        let mut queue = DeferredQueue::new();
        let t0 = Instant::now();
        for page in 1..=4_u32 {
            queue.schedule(page, t0 + Duration::from_millis(100));
        }
        assert_eq!(queue.take_where(|page| page % 2 == 0), vec![2, 4]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain_due(t0 + Duration::from_millis(100)), vec![1, 3]);
    }
}
