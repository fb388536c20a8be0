//! Retry schedule for re-attaching a removed configuration file.

use std::time::Duration;

/// Exponential backoff used when the watched file disappears.
///
/// Attempt `n` that fails schedules attempt `n + 1` after
/// `base * multiplier^n`. Once an attempt numbered above `max_retries` fails,
/// watching is given up for that path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay after the first failed attempt
    pub base: Duration,
    /// Growth factor applied per attempt
    pub multiplier: f64,
    /// Highest attempt number that still schedules a retry
    pub max_retries: u32,
}

impl Backoff {
    /// Delay before the attempt following `attempt`.
    ///
    /// Saturates at [`Duration::MAX`] when the product overflows or is not a
    /// valid duration.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Whether a failure of `attempt` ends the retries.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_retries
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            multiplier: 1.5,
            max_retries: 10,
        }
    }
}
