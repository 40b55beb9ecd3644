//! Retry policy shared by every provider

use std::time::Duration;

/// Exponential backoff policy.
///
/// The delay after failed attempt `i` (0-indexed) is
/// `initial_delay_ms * backoff_multiplier^i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    pub const DEFAULT: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 3000,
        backoff_multiplier: 2,
    };

    /// Backoff to wait after failed attempt `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }

    /// Whether another attempt follows `attempt`
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
