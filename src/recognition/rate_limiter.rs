//! Process-wide rate limiting for the recognition endpoint
//!
//! The limiter enforces a minimum interval between the starts of two
//! consecutive calls, whatever the number of workers. Callers that arrive
//! early wait (asynchronously) for their turn, in arrival order.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Plate Recognizer free tier: one call per two seconds
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Blocking fixed-window limiter shared by all workers
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,

    /// Start time of the most recent call; the mutex also queues waiters
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until a call may start, then claims the slot
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(wait) = time_until_next_call(*last_call, self.min_interval, Instant::now()) {
            tracing::debug!("Recognition rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        *last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

/// Returns None if a call can start at `now`, or the duration to wait otherwise
fn time_until_next_call(
    last_call: Option<Instant>,
    min_interval: Duration,
    now: Instant,
) -> Option<Duration> {
    let last = last_call?;
    let elapsed = now.saturating_duration_since(last);
    if elapsed >= min_interval {
        None
    } else {
        Some(min_interval - elapsed)
    }
}
