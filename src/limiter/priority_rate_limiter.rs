use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::common::{LOWEST_PRIORITY, TimeWindow};
use crate::error::{AcquireError, ConfigError};
use crate::limiter::{PriorityRegistry, WindowTracker};

/// Floor for the monitor sleep so a boundary that is already due does not
/// degenerate into a busy loop.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Blocking, priority-aware, multi-window rate limiter for in-process use.
///
/// Regulates how fast callers are admitted into a protected section,
/// typically outbound calls to an API or a shared resource. Callers block in
/// [`acquire`](PriorityRateLimiter::acquire) until a slot is available,
/// their timeout elapses, or the limiter is shut down.
///
/// # Features
///
/// - **Synchronous limiting:** admits up to the configured number of
///   requests per cycle; everyone else waits for the next one.
/// - **Priority handling:** higher-priority callers are served first;
///   callers of equal priority are served in registration order.
/// - **Hierarchical windows:** independent caps per second, minute, and
///   hour; an admission consumes one slot from every configured window.
/// - **Timeouts:** per-call or instance-default deadlines measured on the
///   monotonic clock; a zero timeout is a non-blocking single attempt.
///
/// # Thread Safety
///
/// Safe for any number of concurrent callers. Waiting threads sleep on an
/// internal monitor and are woken on registrations, window rollovers,
/// admissions, and shutdown; sleeps are always truncated to the next cycle
/// boundary so a rollover cannot be missed.
///
/// # Semantics & Limitations
///
/// **Burst admission:**
/// - No pacing within a window; when a cycle opens, up to the full cap may
///   be admitted immediately.
///
/// **Bounded starvation:**
/// - When higher-priority work keeps arriving at or above the per-second
///   cap, lowest-priority callers can wait indefinitely. Give them a
///   timeout if they must not.
///
/// **Process-scoped:**
/// - Counters live in memory and are neither persisted nor coordinated
///   across processes.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use paceline::{PriorityRateLimiter, TimeWindow};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = PriorityRateLimiter::builder()
///     .with_rate(100, TimeWindow::Second)
///     .with_rate(2_000, TimeWindow::Minute)
///     .with_timeout(Duration::from_secs(5))
///     .build()?;
///
/// // Lowest priority, instance-default timeout.
/// limiter.acquire()?;
///
/// // Served before any lower-priority caller still waiting.
/// limiter.acquire_with_priority(8)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PriorityRateLimiter {
    registry: PriorityRegistry,
    tracker: WindowTracker,
    timeout: Duration,
    monitor: Mutex<()>,
    wakeup: Condvar,
    closed: AtomicBool,
}

impl PriorityRateLimiter {
    /// Start configuring a limiter.
    #[must_use]
    pub fn builder() -> PriorityRateLimiterBuilder {
        PriorityRateLimiterBuilder::default()
    }

    /// Acquire one slot at [`LOWEST_PRIORITY`] with the instance-default
    /// timeout.
    pub fn acquire(&self) -> Result<(), AcquireError> {
        self.acquire_with(LOWEST_PRIORITY, self.timeout)
    }

    /// Acquire one slot at `priority` with the instance-default timeout.
    pub fn acquire_with_priority(&self, priority: u32) -> Result<(), AcquireError> {
        self.acquire_with(priority, self.timeout)
    }

    /// Acquire one slot at [`LOWEST_PRIORITY`] with a call-specific timeout.
    pub fn acquire_with_timeout(&self, timeout: Duration) -> Result<(), AcquireError> {
        self.acquire_with(LOWEST_PRIORITY, timeout)
    }

    /// Acquire one admission slot, blocking until admitted or failed.
    ///
    /// This is the full form behind every other acquire method.
    ///
    /// # Arguments
    ///
    /// - `priority`: positive priority level; larger values are served
    ///   first. `0` is clamped up to [`LOWEST_PRIORITY`].
    /// - `timeout`: total wall-clock budget for this call, measured on the
    ///   monotonic clock. `Duration::ZERO` means a single non-blocking
    ///   attempt; `Duration::MAX` means no deadline.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: admitted; exactly one slot was consumed from every
    ///   configured window.
    /// - `Err(AcquireError::Timeout)`: the deadline elapsed first. The
    ///   caller was deregistered and no slot was consumed.
    /// - `Err(AcquireError::Cancelled)`: the limiter was
    ///   [shut down](PriorityRateLimiter::shutdown) while waiting. The
    ///   caller was deregistered and no slot was consumed.
    ///
    /// # Behavior
    ///
    /// The caller's priority is registered once, then the call loops:
    /// roll the windows forward, test the admission predicate, and either
    /// take a slot or sleep until the next cycle boundary. A caller is
    /// eligible when only lowest-priority work is pending, or when it lies
    /// within the top slots still available this cycle; eligibility alone
    /// is not admission, since every configured window must also have a
    /// free slot.
    ///
    /// A caller that misses cycle `k` competes in cycle `k + 1` with its
    /// standing unchanged, so within one priority the order is first come,
    /// first served. Across priorities, higher always wins.
    pub fn acquire_with(&self, priority: u32, timeout: Duration) -> Result<(), AcquireError> {
        let priority = priority.max(LOWEST_PRIORITY);
        let started = Instant::now();
        self.registry.register(priority);
        self.wakeup.notify_all();

        loop {
            if self.closed.load(Ordering::Acquire) {
                self.deregister(priority);
                return Err(AcquireError::Cancelled);
            }

            let now = Instant::now();
            if self.tracker.roll(now) {
                self.wakeup.notify_all();
            }

            if self.try_admit(priority) {
                trace!(priority, "admitted");
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= timeout {
                self.deregister(priority);
                debug!(priority, ?timeout, "acquire timed out");
                return Err(AcquireError::Timeout(timeout));
            }

            self.sleep(now, timeout - waited);
        }
    } // end method acquire_with

    /// Number of callers currently waiting inside an acquire.
    pub fn pending(&self) -> usize {
        self.registry.pending()
    }

    /// Shut the limiter down, cancelling every waiting caller.
    ///
    /// Pending acquires deregister themselves and fail with
    /// [`AcquireError::Cancelled`]; acquires started after shutdown fail
    /// the same way. No slot is consumed by a cancelled call. Idempotent.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        // Broadcast under the monitor so a waiter cannot check the flag,
        // miss this notification, and then sleep a full cycle.
        let _guard = self.monitor.lock();
        self.wakeup.notify_all();
        debug!("limiter shut down");
    }

    /// One admission attempt: eligibility by priority standing, then an
    /// all-windows slot consumption.
    fn try_admit(&self, priority: u32) -> bool {
        let eligible = self.registry.only_lowest_pending()
            || self.registry.among_first(priority, self.tracker.leftover());
        if eligible && self.tracker.try_consume() {
            self.deregister(priority);
            self.wakeup.notify_all();
            return true;
        }
        false
    }

    fn deregister(&self, priority: u32) {
        let removed = self.registry.remove_one(priority);
        debug_assert!(removed, "deregistering a priority that was never registered");
    }

    /// Sleep on the monitor until the next cycle boundary, the caller's
    /// remaining budget, or a wakeup, whichever comes first.
    fn sleep(&self, now: Instant, remaining: Duration) {
        let boundary = self.tracker.second_epoch() + TimeWindow::Second.duration();
        let until_boundary = boundary.saturating_duration_since(now);
        let wait = until_boundary.min(remaining).max(MIN_SLEEP);

        let mut guard = self.monitor.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.wakeup.wait_for(&mut guard, wait);
    } // end method sleep
} // end of impl

/// Chainable configuration for [`PriorityRateLimiter`].
///
/// Rates are set per [`TimeWindow`]; windows never given a rate are
/// unconstrained. Validation happens in
/// [`build`](PriorityRateLimiterBuilder::build).
///
/// # Examples
///
/// ```rust
/// use paceline::{ConfigError, PriorityRateLimiter, TimeWindow};
///
/// let missing = PriorityRateLimiter::builder()
///     .with_rate(60, TimeWindow::Minute)
///     .build();
/// assert_eq!(missing.unwrap_err(), ConfigError::MissingSecondRate);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PriorityRateLimiterBuilder {
    rates: [Option<u32>; TimeWindow::COUNT],
    timeout: Option<Duration>,
}

impl PriorityRateLimiterBuilder {
    /// Cap admissions at `rate` per cycle of `window`. Repeatable, one
    /// window at a time; the last call per window wins.
    #[must_use]
    pub fn with_rate(mut self, rate: u32, window: TimeWindow) -> Self {
        self.rates[window.index()] = Some(rate);
        self
    }

    /// Shorthand for the common per-second cap.
    #[must_use]
    pub fn with_rate_per_second(self, rate: u32) -> Self {
        self.with_rate(rate, TimeWindow::Second)
    }

    /// Default deadline applied to acquires that do not bring their own.
    /// Without this, acquires without an explicit timeout block until
    /// admitted.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the configuration and build the limiter.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidRate`] when any configured rate is zero.
    /// - [`ConfigError::InvalidTimeout`] when the default timeout is zero.
    /// - [`ConfigError::MissingSecondRate`] when no per-second rate was
    ///   configured; the second window is the base cycle and is mandatory.
    pub fn build(self) -> Result<PriorityRateLimiter, ConfigError> {
        if self.rates.iter().flatten().any(|&rate| rate == 0) {
            return Err(ConfigError::InvalidRate);
        }
        if self.rates[TimeWindow::Second.index()].is_none() {
            return Err(ConfigError::MissingSecondRate);
        }
        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(ConfigError::InvalidTimeout);
        }

        let caps = self.rates.map(|rate| rate.unwrap_or(0));
        Ok(PriorityRateLimiter {
            registry: PriorityRegistry::new(),
            tracker: WindowTracker::new(caps, Instant::now()),
            timeout: self.timeout.unwrap_or(Duration::MAX),
            monitor: Mutex::new(()),
            wakeup: Condvar::new(),
            closed: AtomicBool::new(false),
        })
    } // end method build
}
