//! Blocking, priority-aware admission limiting.
//!
//! The limiter composes two small components under one monitor:
//!
//! - [`PriorityRegistry`]: the ordered multiset of priorities currently
//!   waiting, which decides *who* may take a slot this cycle.
//! - [`WindowTracker`]: per-window admission counters with independent
//!   rollover, which decide *whether* a slot is left to take.
//!
//! [`PriorityRateLimiter`] drives both from its blocking acquire loop:
//! callers register their priority, repeatedly roll the windows forward and
//! test the admission predicate, and otherwise sleep until the next cycle
//! boundary.
//!
//! # When to Use
//!
//! - Throttling outbound calls to an API with per-second (and coarser)
//!   quotas from many threads of one process.
//! - Serving latency-sensitive work ahead of batch work under one shared
//!   quota via priorities.
//!
//! Not a fit when limits must be coordinated across processes or survive a
//! restart; counters are strictly in-memory.

mod priority_rate_limiter;
pub use priority_rate_limiter::*;

mod priority_registry;
pub(crate) use priority_registry::PriorityRegistry;

mod window_tracker;
pub(crate) use window_tracker::WindowTracker;
