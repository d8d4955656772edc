//! Cancellation tokens for in-flight render work
//!
//! Every render request carries a token. When a request is superseded (the
//! page scrolled away, or zoom/rotation changed again before it finished) the
//! owner cancels the token; the host can skip the work, and a completion that
//! still arrives is recognised as stale by its generation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative cancellation
///
/// Clones share the same underlying flag, so the request handed to a host and
/// the copy kept in the registry observe the same state.
///
/// # Example
///
/// ```
/// use pageview_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let host_copy = token.clone();
///
/// token.cancel();
/// assert!(host_copy.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel this token and all of its clones. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if this token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered token plus the generation it was issued under.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub generation: u64,
    pub token: CancellationToken,
}

/// At most one live ticket per key
///
/// Registering a key again cancels the ticket it replaces. Generations are
/// strictly increasing across the whole registry, so a completion can be
/// checked with [`CancellationRegistry::is_current`].
#[derive(Debug)]
pub struct CancellationRegistry<K> {
    tickets: HashMap<K, Ticket>,
    next_generation: u64,
}

impl<K> CancellationRegistry<K>
where
    K: Eq + Hash + Copy,
{
    /// Create a new empty registry
    pub fn new() -> Self {
        Self { tickets: HashMap::new(), next_generation: 1 }
    }

    /// Issue a fresh ticket for `key`, cancelling any previous one.
    pub fn register(&mut self, key: K) -> Ticket {
        let generation = self.next_generation;
        self.next_generation += 1;

        let ticket = Ticket { generation, token: CancellationToken::new() };
        if let Some(previous) = self.tickets.insert(key, ticket.clone()) {
            previous.token.cancel();
        }
        ticket
    }

    /// Cancel and forget the ticket for `key`. Returns `true` if one existed.
    pub fn cancel(&mut self, key: K) -> bool {
        match self.tickets.remove(&key) {
            Some(ticket) => {
                ticket.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel all registered tickets
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tickets.len();
        for (_, ticket) in self.tickets.drain() {
            ticket.token.cancel();
        }
        count
    }

    /// Whether `generation` is the live ticket for `key`.
    pub fn is_current(&self, key: K, generation: u64) -> bool {
        self.tickets.get(&key).is_some_and(|ticket| ticket.generation == generation)
    }

    /// Retire the ticket for `key` if `generation` is current. Returns `true` on success.
    pub fn complete(&mut self, key: K, generation: u64) -> bool {
        if self.is_current(key, generation) {
            self.tickets.remove(&key);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.tickets.contains_key(&key)
    }

    pub fn get(&self, key: K) -> Option<&Ticket> {
        self.tickets.get(&key)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl<K> Default for CancellationRegistry<K>
where
    K: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
