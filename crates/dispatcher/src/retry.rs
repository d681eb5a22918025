//! Per-backend retry policy with exponential backoff

use std::time::Duration;

use contracts::RetryConfig;

/// Attempts per backend and the wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Attempts made on each backend before falling back
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait after the failed attempt at `attempt_index` (0-based, per backend)
    ///
    /// `base_delay * 2^attempt_index`, capped at `max_delay`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        2u32.checked_pow(attempt_index)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// True when another attempt on the same backend follows `attempt_index`
    pub fn has_next(&self, attempt_index: u32) -> bool {
        attempt_index + 1 < self.max_retries
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.base_delay(), config.max_delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
