//! Loop timing.

use std::time::Duration;

/// Default wait after a poll that returned nothing (5 seconds).
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(5);

/// Default wait after an iteration failed unexpectedly (10 seconds).
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Timing configuration for the runner loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Sleep after an empty poll.
    ///
    /// Default: 5 seconds. Configure via `RUNNER_IDLE_BACKOFF_SECS`.
    pub idle_backoff: Duration,

    /// Sleep after a failed iteration.
    ///
    /// Default: 10 seconds. Configure via `RUNNER_ERROR_BACKOFF_SECS`.
    pub error_backoff: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        RunnerConfig {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}
