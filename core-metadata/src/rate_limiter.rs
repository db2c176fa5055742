//! Minimum-interval rate limiting shared by provider clients.
//!
//! A [`RateLimiter`] is owned by one provider and shared (via `Arc`) by every
//! task that calls it. The lock is held across the wait, so concurrent callers
//! queue up and each one observes the interval relative to the previous grant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterStats {
    /// Grants handed out.
    pub acquisitions: u64,
    /// Grants that had to wait.
    pub throttled: u64,
}

pub struct RateLimiter {
    name: &'static str,
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
    acquisitions: AtomicU64,
    throttled: AtomicU64,
}

impl RateLimiter {
    pub fn new(name: &'static str, min_interval: Duration) -> Self {
        Self {
            name,
            min_interval,
            last_grant: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
        }
    }

    pub fn from_millis(name: &'static str, min_interval_ms: u64) -> Self {
        Self::new(name, Duration::from_millis(min_interval_ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until at least `min_interval` has passed since the previous grant.
    pub async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;

        if let Some(last) = *last_grant {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!(limiter = self.name, wait_ms = wait_time.as_millis() as u64, "Rate limiting");
                self.throttled.fetch_add(1, Ordering::Relaxed);
                sleep(wait_time).await;
            }
        }

        *last_grant = Some(Instant::now());
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
