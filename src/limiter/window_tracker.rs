use std::time::Instant;

use parking_lot::Mutex;
use tracing::trace;

use crate::common::TimeWindow;

#[derive(Debug)]
struct TrackerState {
    used: [u32; TimeWindow::COUNT],
    epochs: [Instant; TimeWindow::COUNT],
}

/// Per-window admission counters with rollover on elapsed wall-clock time.
///
/// A window with a cap of zero is unconstrained and never inspected. Each
/// configured window keeps its own epoch and is reset only when its own
/// duration has elapsed, so exhausting the second budget never touches the
/// minute or hour bookkeeping.
///
/// All state lives behind one lock; [`try_consume`](WindowTracker::try_consume)
/// checks every configured counter and increments all of them in the same
/// critical section, so `used` can never exceed a window's cap.
#[derive(Debug)]
pub(crate) struct WindowTracker {
    caps: [u32; TimeWindow::COUNT],
    state: Mutex<TrackerState>,
}

impl WindowTracker {
    pub(crate) fn new(caps: [u32; TimeWindow::COUNT], now: Instant) -> Self {
        debug_assert!(caps[TimeWindow::Second.index()] > 0);
        Self {
            caps,
            state: Mutex::new(TrackerState {
                used: [0; TimeWindow::COUNT],
                epochs: [now; TimeWindow::COUNT],
            }),
        }
    }

    /// Reset every configured window whose own duration has elapsed since
    /// its epoch. Returns whether any window rolled.
    ///
    /// Idempotent: re-entering with a non-advancing clock changes nothing.
    pub(crate) fn roll(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let mut rolled = false;
        for window in TimeWindow::ALL {
            let w = window.index();
            if self.caps[w] == 0 {
                continue;
            }
            if now.saturating_duration_since(state.epochs[w]) >= window.duration() {
                trace!(?window, released = state.used[w], "window rolled");
                state.used[w] = 0;
                state.epochs[w] = now;
                rolled = true;
            }
        }
        rolled
    }

    /// The admission gate: consume one slot from every configured window,
    /// or none at all.
    ///
    /// Returns `true` and increments every configured counter when all of
    /// them are below their caps; returns `false` without touching anything
    /// otherwise.
    pub(crate) fn try_consume(&self) -> bool {
        let mut state = self.state.lock();
        let exhausted = TimeWindow::ALL
            .iter()
            .map(|window| window.index())
            .any(|w| self.caps[w] > 0 && state.used[w] >= self.caps[w]);
        if exhausted {
            return false;
        }
        for window in TimeWindow::ALL {
            let w = window.index();
            if self.caps[w] > 0 {
                state.used[w] += 1;
            }
        }
        true
    }

    /// Admissions still permitted in the current cycle: the minimum of
    /// `cap - used` across configured windows, i.e. the tightest remaining
    /// budget.
    pub(crate) fn leftover(&self) -> u32 {
        let state = self.state.lock();
        TimeWindow::ALL
            .iter()
            .map(|window| window.index())
            .filter(|&w| self.caps[w] > 0)
            .map(|w| self.caps[w] - state.used[w])
            .min()
            .unwrap_or(0)
    }

    /// Epoch of the current second window; the next cycle starts one second
    /// after this instant.
    pub(crate) fn second_epoch(&self) -> Instant {
        self.state.lock().epochs[TimeWindow::Second.index()]
    }
}
