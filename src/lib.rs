//! Paceline is a set of blocking concurrency-control primitives for
//! in-process use.
//!
//! The crate centers on a priority-aware, multi-window rate limiter:
//! - callers block until admitted, their timeout elapses, or the limiter
//!   shuts down
//! - higher priorities are served first; equal priorities are first come,
//!   first served
//! - independent caps per second, minute, and hour window
//!
//! It also bundles [`KeyedMutex`] (per-key mutual exclusion with bounded
//! in-flight capacity) and [`ObjectPool`] (a small recycling cache).
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use paceline::{PriorityRateLimiter, TimeWindow};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = PriorityRateLimiter::builder()
//!     .with_rate(100, TimeWindow::Second)
//!     .with_timeout(Duration::from_secs(5))
//!     .build()?;
//!
//! // Blocks until a slot in the current second is free.
//! limiter.acquire()?;
//!
//! // Urgent work overtakes waiting lower-priority callers.
//! limiter.acquire_with_priority(8)?;
//! # Ok(())
//! # }
//! ```

mod common;
pub use common::*;

mod error;
pub use error::*;

mod limiter;
pub use limiter::*;

mod lock;
pub use lock::*;

mod pool;
pub use pool::*;

#[cfg(test)]
mod tests;
