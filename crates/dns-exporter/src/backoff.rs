//! Retry policy for zone fetches.

use rand::Rng;
use std::time::Duration;

/// Attempts per zone before giving up for the cycle
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default cap on a single backoff wait
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Upper bound of the random jitter added to each wait, in seconds
pub const MAX_JITTER_SECS: f64 = 2.0;

/// Exponential backoff with additive jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts per zone
    pub max_attempts: u32,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffPolicy {
    /// Create a policy with the default attempt budget and cap
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set maximum backoff duration
    #[must_use]
    pub const fn max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Wait after failed attempt `attempt` (0-indexed) with the given jitter.
    ///
    /// Computes `min(max_backoff, 2^attempt + jitter)`; jitter is clamped to
    /// `[0, MAX_JITTER_SECS]`.
    #[must_use]
    pub fn delay_with_jitter(&self, attempt: u32, jitter_secs: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let jitter = if jitter_secs.is_nan() {
            0.0
        } else {
            jitter_secs.clamp(0.0, MAX_JITTER_SECS)
        };
        let secs = (2f64.powi(exponent) + jitter).min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Wait after failed attempt `attempt` with uniform random jitter
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER_SECS);
        self.delay_with_jitter(attempt, jitter)
    }
}
