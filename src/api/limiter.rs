//! Global call-rate limiter
//!
//! One limiter is shared by every worker and every nested call an article
//! makes, so total throughput is capped regardless of worker count.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Spaces calls evenly at a fixed calls-per-second ceiling
///
/// Each caller reserves the next free slot under the lock and then sleeps
/// until that slot outside the lock, so waiting callers do not serialize on
/// the mutex for the length of their delay.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Creates a limiter allowing `calls_per_second` calls per second
    ///
    /// A ceiling of zero is treated as one.
    pub fn new(calls_per_second: u32) -> Self {
        let interval = Duration::from_secs(1) / calls_per_second.max(1);
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Minimum spacing between two calls
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the caller may issue one call
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        sleep_until(slot).await;
    }
}
