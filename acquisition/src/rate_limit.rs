//! Single-threaded token-bucket rate limiter for remote downloads.
//!
//! A `tokio::sync::Semaphore` refilled on an interval, matching §5's
//! "separate single-threaded rate-limiter" requirement without pulling in a
//! generic leaky-bucket crate for one simple policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

pub struct DownloadRateLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl DownloadRateLimiter {
    /// Spawns the refill task and returns the limiter. `downloads_per_minute`
    /// is both the bucket capacity and the refill budget.
    #[must_use]
    pub fn new(downloads_per_minute: u32) -> Self {
        let capacity = downloads_per_minute.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(capacity));
        let refill = Arc::clone(&semaphore);
        let period = Duration::from_secs_f64(60.0 / capacity as f64);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if refill.available_permits() < capacity {
                    refill.add_permits(1);
                }
            }
        });
        Self { semaphore, capacity }
    }

    /// Blocks until a download slot is free, then permanently consumes it:
    /// the budget only comes back via the refill task above, never on drop.
    pub async fn acquire(&self) {
        let permit = self.semaphore.acquire().await.expect("rate limiter semaphore is never closed");
        permit.forget();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
