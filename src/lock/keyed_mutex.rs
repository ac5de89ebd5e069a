use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::trace;

use crate::error::CapacityExhausted;
use crate::pool::ObjectPool;

/// Usage-count value marking a slot that has been removed from the table.
/// A claimed tombstone forces the claimer back to the table for a fresh
/// slot, so two threads can never hold different locks for the same key.
const EVICTED: usize = usize::MAX;

/// The lock behind one key, plus the number of threads currently between
/// claim and release on it (holders and waiters alike).
struct KeySlot {
    lock: ReentrantMutex<()>,
    users: AtomicUsize,
}

impl KeySlot {
    fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(()),
            users: AtomicUsize::new(0),
        }
    }

    /// Claim a usage on this slot unless it has already been evicted.
    fn claim(&self) -> bool {
        self.users
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |users| {
                (users != EVICTED).then_some(users + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.users.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-key mutual exclusion with bounded in-flight capacity.
///
/// Maps application-supplied keys to reentrant locks created on first use.
/// [`locked`](KeyedMutex::locked) runs an action while holding the lock for
/// its key, so operations on the same key serialize while operations on
/// different keys proceed in parallel.
///
/// A capacity gate bounds the number of simultaneously held locks across
/// all keys; when it is exhausted, callers either block until capacity
/// frees up (default) or fail fast, per
/// [`with_wait_on_overload`](KeyedMutexBuilder::with_wait_on_overload).
///
/// A key slot with no holders and no waiters is evicted from the table on
/// release, so the table tracks only keys actually in use. Evicted slots
/// are recycled through an internal [`ObjectPool`].
///
/// # Fairness
///
/// In fair mode (default) the capacity gate serves callers strictly first
/// come, first served, and per-key locks are released with a fair hand-off
/// to the longest-waiting thread.
///
/// # Examples
///
/// ```rust
/// use paceline::KeyedMutex;
///
/// let accounts = KeyedMutex::<String>::builder().build();
///
/// accounts
///     .locked("acct-42".to_string(), || {
///         // read-modify-write on account 42, serialized with every other
///         // locked() on the same key
///     })
///     .unwrap();
/// ```
pub struct KeyedMutex<K: Eq + Hash + Clone> {
    slots: DashMap<K, Arc<KeySlot>>,
    recycled: ObjectPool<Arc<KeySlot>>,
    capacity: CapacityGate,
    wait_on_overload: bool,
    fair: bool,
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    /// Start configuring a keyed mutex.
    #[must_use]
    pub fn builder() -> KeyedMutexBuilder {
        KeyedMutexBuilder::default()
    }

    /// Run `action` while holding the lock for `key`.
    ///
    /// The key's lock is created on first use and is reentrant: nested
    /// `locked` calls for the same key from the same thread proceed, each
    /// nesting level consuming one capacity permit.
    ///
    /// # Returns
    ///
    /// - `Ok` with the action's result once it ran under the lock.
    /// - `Err(CapacityExhausted)` in fail-fast mode when every in-flight
    ///   permit is taken; the action did not run. In wait mode this method
    ///   never fails.
    pub fn locked<R>(&self, key: K, action: impl FnOnce() -> R) -> Result<R, CapacityExhausted> {
        self.capacity.acquire(self.wait_on_overload)?;
        let session = SlotSession {
            owner: self,
            key: &key,
            slot: self.claim_slot(&key),
        };

        let guard = session.slot.lock.lock();
        let result = action();
        if self.fair {
            ReentrantMutexGuard::unlock_fair(guard);
        } else {
            drop(guard);
        }

        drop(session);
        Ok(result)
    } // end method locked

    /// Get-or-create the slot for `key` and claim a usage on it, retrying
    /// when a concurrent release evicted the slot between lookup and claim.
    fn claim_slot(&self, key: &K) -> Arc<KeySlot> {
        loop {
            let slot = self
                .slots
                .entry(key.clone())
                .or_insert_with(|| self.recycled.request())
                .clone();
            if slot.claim() {
                return slot;
            }
            // Lost the race; the tombstoned slot is already out of the table.
        }
    }

    /// Evict the slot for `key` when nobody holds or waits on it. The
    /// usage count is swapped for a tombstone inside the table guard, so a
    /// concurrent claimer either blocks the eviction or retries on a fresh
    /// slot.
    fn evict_if_idle(&self, key: &K) {
        let evicted = self.slots.remove_if(key, |_, slot| {
            slot.users
                .compare_exchange(0, EVICTED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        });
        let Some((_, slot)) = evicted else {
            return;
        };
        trace!("evicted idle key slot");

        // Recycle only when this is the last reference; a claimer that lost
        // the race may still briefly hold a clone.
        if Arc::strong_count(&slot) == 1 {
            slot.users.store(0, Ordering::Release);
            self.recycled.release(slot);
        }
    } // end method evict_if_idle

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
} // end of impl

/// Releases a claimed slot on drop, then tries to evict it and returns the
/// capacity permit. Runs on panic unwind as well, so a panicking action
/// cannot leak permits or pin its key slot in the table.
struct SlotSession<'a, K: Eq + Hash + Clone> {
    owner: &'a KeyedMutex<K>,
    key: &'a K,
    slot: Arc<KeySlot>,
}

impl<K: Eq + Hash + Clone> Drop for SlotSession<'_, K> {
    fn drop(&mut self) {
        self.slot.release();
        self.owner.evict_if_idle(self.key);
        self.owner.capacity.release();
    }
}

struct GateState {
    permits: usize,
    next_ticket: u64,
    now_serving: u64,
}

/// Counting gate bounding the locks simultaneously held across all keys.
/// In fair mode callers take numbered tickets and are served in order.
struct CapacityGate {
    state: Mutex<GateState>,
    available: Condvar,
    fair: bool,
}

impl CapacityGate {
    fn new(permits: usize, fair: bool) -> Self {
        Self {
            state: Mutex::new(GateState {
                permits,
                next_ticket: 0,
                now_serving: 0,
            }),
            available: Condvar::new(),
            fair,
        }
    }

    fn acquire(&self, wait: bool) -> Result<(), CapacityExhausted> {
        let mut state = self.state.lock();

        if !wait
            && (state.permits == 0 || (self.fair && state.next_ticket != state.now_serving))
        {
            return Err(CapacityExhausted);
        }

        if self.fair {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            while state.permits == 0 || state.now_serving != ticket {
                self.available.wait(&mut state);
            }
            state.now_serving += 1;
            state.permits -= 1;
            if state.permits > 0 {
                // The next ticket holder may be admissible right away.
                self.available.notify_all();
            }
        } else {
            while state.permits == 0 {
                self.available.wait(&mut state);
            }
            state.permits -= 1;
        }
        Ok(())
    } // end method acquire

    fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        self.available.notify_all();
    }
}

/// Chainable configuration for [`KeyedMutex`].
#[derive(Clone, Debug)]
pub struct KeyedMutexBuilder {
    initial_capacity: usize,
    max_in_flight: usize,
    wait_on_overload: bool,
    fair: bool,
}

impl Default for KeyedMutexBuilder {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_in_flight: usize::MAX,
            wait_on_overload: true,
            fair: true,
        }
    }
}

impl KeyedMutexBuilder {
    /// Initial sizing hint for the key table.
    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Maximum number of simultaneously held locks across all keys.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Whether callers block for capacity (`true`, default) or fail fast
    /// with [`CapacityExhausted`] (`false`) when the bound is reached.
    #[must_use]
    pub fn with_wait_on_overload(mut self, wait_on_overload: bool) -> Self {
        self.wait_on_overload = wait_on_overload;
        self
    }

    /// First-come-first-served capacity admission and fair per-key lock
    /// hand-off. On by default.
    #[must_use]
    pub fn with_fairness(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// Build the keyed mutex.
    #[must_use]
    pub fn build<K: Eq + Hash + Clone>(self) -> KeyedMutex<K> {
        KeyedMutex {
            slots: DashMap::with_capacity(self.initial_capacity),
            recycled: ObjectPool::new(|| Arc::new(KeySlot::new()), self.max_in_flight),
            capacity: CapacityGate::new(self.max_in_flight, self.fair),
            wait_on_overload: self.wait_on_overload,
            fair: self.fair,
        }
    }
}
