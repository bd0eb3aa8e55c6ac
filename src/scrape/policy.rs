//! Retry policy for transient fetch failures
//!
//! The policy is a plain value injected into the workers, so retry behavior
//! is testable in isolation without any network or clock machinery.

use crate::config::ScrapeConfig;
use std::time::Duration;

/// Bounded exponential backoff: `base * 2^attempt`, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts per item (first try included)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Builds the policy from scrape configuration
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(
            config.retry_ceiling,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_cap_ms),
        )
    }

    /// Delay before the retry following failed attempt number `attempt`
    /// (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        // Clamp the shift so the factor cannot overflow.
        let factor = 1u32 << attempt.min(16);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}
