use std::time::Duration;

/// Default and lowest priority level accepted by the limiter.
///
/// Larger values are served first. Priorities below this value are clamped
/// up to it.
pub const LOWEST_PRIORITY: u32 = 1;

/// Granularity of one rate-limiting window.
///
/// Each window carries its own cap and rolls over independently once its
/// duration has elapsed. Finer-grained units are not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    /// One-second window.
    Second,
    /// Sixty-second window.
    Minute,
    /// Sixty-minute window.
    Hour,
}

impl TimeWindow {
    pub(crate) const COUNT: usize = 3;

    pub(crate) const ALL: [TimeWindow; TimeWindow::COUNT] =
        [TimeWindow::Second, TimeWindow::Minute, TimeWindow::Hour];

    /// Duration of one full cycle of this window.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            TimeWindow::Second => Duration::from_secs(1),
            TimeWindow::Minute => Duration::from_secs(60),
            TimeWindow::Hour => Duration::from_secs(3600),
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}
