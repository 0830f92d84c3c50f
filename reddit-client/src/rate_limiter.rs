use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum outbound calls in flight at once.
    pub max_in_flight: usize,
    /// Spacing budget; each completed call occupies its slot for
    /// `60 / max_calls_per_minute` seconds before the slot frees.
    pub max_calls_per_minute: f64,
}

impl RateLimitConfig {
    pub fn reddit() -> Self {
        Self {
            max_in_flight: 50,
            max_calls_per_minute: 100.0,
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.max_calls_per_minute)
    }
}

/// Bounds outbound API calls on two independent axes: concurrent calls in
/// flight, and minimum spacing between call completions.
///
/// `acquire` never fails and never drops a caller; it only delays. Fairness
/// is whatever the underlying semaphore provides (FIFO-ish).
#[derive(Debug)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_in_flight)),
            min_interval: config.min_interval(),
        }
    }

    /// Waits until one more outbound call is permitted. The returned permit
    /// must be released once the call completes.
    pub async fn acquire(&self) -> RateLimitPermit {
        let start_time = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore should not be closed");

        let queue_wait_time = start_time.elapsed();
        if !queue_wait_time.is_zero() {
            debug!("Waited {:?} for a rate limit slot", queue_wait_time);
        }

        RateLimitPermit {
            _permit: permit,
            min_interval: self.min_interval,
            queue_wait_time,
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[derive(Debug)]
pub struct RateLimitPermit {
    _permit: OwnedSemaphorePermit,
    min_interval: Duration,
    pub queue_wait_time: Duration,
}

impl RateLimitPermit {
    /// Holds the slot for the spacing interval, then frees it. Dropping the
    /// permit without calling this frees the slot immediately, skipping the
    /// spacing delay.
    pub async fn release(self) {
        sleep(self.min_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn test_reddit_config_defaults() {
        let config = RateLimitConfig::reddit();
        assert_eq!(config.max_in_flight, 50);
        assert_eq!(config.min_interval(), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_release_enforces_minimum_spacing() {
        // 600 calls per minute = 100ms between completions
        let limiter = RateLimiter::new(RateLimitConfig {
            max_in_flight: 1,
            max_calls_per_minute: 600.0,
        });

        let start = Instant::now();
        for _ in 0..4 {
            let permit = limiter.acquire().await;
            permit.release().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_in_flight_bound() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_in_flight: 2,
            max_calls_per_minute: 60_000.0,
        });

        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        // Third caller must wait until a slot frees
        let blocked = timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(blocked.is_err());

        first.release().await;
        let third = timeout(Duration::from_millis(100), limiter.acquire()).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_queue_wait_time_tracking() {
        let limiter = RateLimiter::new(RateLimitConfig::reddit());

        let permit = limiter.acquire().await;
        assert!(permit.queue_wait_time < Duration::from_secs(1));
    }
}
