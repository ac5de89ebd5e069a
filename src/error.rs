use std::time::Duration;

/// Error returned from a blocking acquire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// The deadline elapsed before an admission slot became available.
    #[error("timed out after {0:?} waiting for admission")]
    Timeout(Duration),
    /// The limiter was shut down while the caller was waiting.
    #[error("limiter shut down while waiting for admission")]
    Cancelled,
}

impl AcquireError {
    /// Returns `true` if the acquire failed because its deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AcquireError::Timeout(_))
    }

    /// Returns `true` if the acquire failed because the limiter shut down.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AcquireError::Cancelled)
    }
}

/// Error raised while validating limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A configured rate was zero.
    #[error("rate must be greater than zero")]
    InvalidRate,
    /// The configured default timeout was zero.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
    /// No per-second rate was configured.
    #[error("a per-second rate is required")]
    MissingSecondRate,
}

/// Returned by fail-fast keyed locking when every in-flight lock permit is
/// taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("concurrent lock capacity exhausted")]
pub struct CapacityExhausted;
