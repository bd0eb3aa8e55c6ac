//! Shared request-rate limiter
//!
//! All fetch workers in a run funnel through one limiter so that the
//! aggregate request rate stays under the configured ceiling no matter how
//! many workers are running.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Paces requests to a global ceiling
///
/// Each grant reserves the next free slot and pushes it forward by one
/// inter-request interval; callers sleep until their slot arrives. Tokio's
/// mutex hands out the lock in FIFO order, so no caller can be postponed
/// indefinitely.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given ceiling in requests per second
    ///
    /// The ceiling must be positive; configuration validation enforces this
    /// before a limiter is ever built.
    pub fn new(requests_per_sec: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / requests_per_sec),
            next_slot: Mutex::new(None),
        }
    }

    /// Blocks until the caller may issue one request
    pub async fn acquire(&self) {
        let grant = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let grant = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(grant + self.interval);
            grant
        };

        // The lock is released before waiting; only the reservation is serialized.
        tokio::time::sleep_until(grant).await;
    }

    /// The configured minimum spacing between requests
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
