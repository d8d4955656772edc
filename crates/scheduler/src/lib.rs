//! Pageview Scheduler Library
//!
//! Small timing primitives for a cooperative, single-threaded viewer loop.
//! Nothing here reads the clock: every call takes the current [`Instant`]
//! from the caller, so behaviour is deterministic under test.
//!
//! - [`Throttle`] drops calls that arrive inside a minimum interval
//! - [`Debouncer`] holds the latest value until input goes quiet
//! - [`DeferredQueue`] releases tasks once their due time passes
//! - [`CancellationRegistry`] tracks one cancellable ticket per key
//!
//! # Example
//!
//! ```
//! use pageview_scheduler::{CancellationRegistry, DeferredQueue};
//! use std::time::{Duration, Instant};
//!
//! let mut renders = CancellationRegistry::new();
//! let ticket = renders.register(7_u32);
//!
//! // page 7 scrolled out of view before the host got to it
//! renders.cancel(7);
//! assert!(ticket.token.is_cancelled());
//!
//! let mut snapshots = DeferredQueue::new();
//! let now = Instant::now();
//! snapshots.schedule(3_u32, now + Duration::from_millis(100));
//! assert_eq!(snapshots.drain_due(now + Duration::from_millis(100)), vec![3]);
//! ```
//!
//! [`Instant`]: std::time::Instant

mod cancel;
mod debounce;
mod deferred;
mod throttle;

pub use cancel::{CancellationRegistry, CancellationToken, Ticket};
pub use debounce::Debouncer;
pub use deferred::DeferredQueue;
pub use throttle::Throttle;
