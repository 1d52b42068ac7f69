use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

const MIN_INTERVAL_FLOOR_MS: u64 = 50;

/// Spaces out external calls by a minimum interval.
///
/// Runs on tokio's clock, so a paused test runtime advances it virtually.
pub struct RateLimiter {
    min_interval_ms: AtomicU64,
    last_tick: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: AtomicU64::new(Self::clamp_ms(min_interval)),
            last_tick: AsyncMutex::new(None),
        }
    }

    pub fn set_min_interval(&self, min_interval: Duration) {
        self.min_interval_ms
            .store(Self::clamp_ms(min_interval), Ordering::SeqCst);
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.load(Ordering::SeqCst))
    }

    fn clamp_ms(interval: Duration) -> u64 {
        (interval.as_millis() as u64).max(MIN_INTERVAL_FLOOR_MS)
    }

    /// Suspends until the interval since the previous release has passed, then releases.
    pub async fn wait(&self) {
        self.acquire_if(|| true).await;
    }

    /// Like [`RateLimiter::wait`], but only records the release if `still_wanted` holds once
    /// the interval has passed. A declined slot does not delay the next caller.
    pub async fn acquire_if(&self, still_wanted: impl Fn() -> bool) -> bool {
        let interval = self.min_interval();
        let mut guard = self.last_tick.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                trace!(delay = ?(interval - elapsed), "throttling geocoder call");
                sleep(interval - elapsed).await;
            }
        }
        if !still_wanted() {
            trace!("released geocoder slot unused");
            return false;
        }
        *guard = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_not_delayed() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_consecutive_calls() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2_100));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_counts_toward_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait().await;
        sleep(Duration::from_millis(1_500)).await;
        let before = Instant::now();
        limiter.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_slot_does_not_delay_next_call() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait().await;
        assert!(!limiter.acquire_if(|| false).await);

        let before = Instant::now();
        assert!(limiter.acquire_if(|| true).await);
        assert_eq!(before.elapsed(), Duration::ZERO);

        let before = Instant::now();
        limiter.wait().await;
        assert!(before.elapsed() >= Duration::from_secs(1));
        assert!(before.elapsed() < Duration::from_millis(1_100));
    }

    #[test]
    fn floors_tiny_intervals() {
        let limiter = RateLimiter::new(Duration::from_millis(1));
        assert_eq!(limiter.min_interval(), Duration::from_millis(50));
        limiter.set_min_interval(Duration::from_millis(250));
        assert_eq!(limiter.min_interval(), Duration::from_millis(250));
    }
}
