//! Keyed mutual exclusion.
//!
//! [`KeyedMutex`] serializes work per application-supplied key while work on
//! different keys runs in parallel, with a configurable bound on the total
//! number of locks held at once. Useful in front of per-entity critical
//! sections, e.g. "one writer per account id at a time".

mod keyed_mutex;
pub use keyed_mutex::*;
