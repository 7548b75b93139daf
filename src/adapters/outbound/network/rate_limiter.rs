use governor::{DefaultDirectRateLimiter, Quota};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default proactive budget for one remote service
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 150;
pub const DEFAULT_BURST: u32 = 10;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait interrupted by cancellation")]
pub struct Interrupted;

/// Token bucket plus a shared "resume after" window for one remote service.
///
/// Every worker talking to the service holds the same instance (via `Arc`),
/// so a server-directed pause recorded by one request delays all of them.
/// The window lock is only held to read or update it.
pub struct RateLimiter {
    bucket: DefaultDirectRateLimiter,
    resume_after: Mutex<Option<Instant>>,
    requests_per_second: NonZeroU32,
    burst: NonZeroU32,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let requests_per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: DefaultDirectRateLimiter::direct(
                Quota::per_second(requests_per_second).allow_burst(burst),
            ),
            resume_after: Mutex::new(None),
            requests_per_second,
            burst,
        }
    }

    /// Waits until a request may be sent: a token is available and any
    /// active backoff window has passed.
    ///
    /// Never fails on its own; only `cancel` firing interrupts the wait.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Interrupted> {
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(Interrupted),
            _ = self.bucket.until_ready() => {}
        }
        self.wait_for_backoff(cancel).await
    }

    /// Pauses every caller for at least `delay` from now.
    ///
    /// An existing window that already ends later is kept; a zero delay
    /// is ignored.
    pub fn backoff(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let Some(until) = Instant::now().checked_add(delay) else {
            warn!(delay_secs = delay.as_secs(), "ignoring backoff beyond the clock range");
            return;
        };
        let mut resume_after = self.lock();
        if resume_after.map_or(true, |current| until > current) {
            debug!(delay_ms = delay.as_millis() as u64, "extending shared backoff window");
            *resume_after = Some(until);
        }
    }

    /// End of the current backoff window, if one is active.
    pub fn resume_after(&self) -> Option<Instant> {
        let now = Instant::now();
        self.lock().filter(|until| *until > now)
    }

    async fn wait_for_backoff(&self, cancel: &CancellationToken) -> Result<(), Interrupted> {
        // Re-checked after each wait in case the window was extended.
        while let Some(until) = self.resume_after() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Interrupted),
                _ = sleep_until(until) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.resume_after.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND, DEFAULT_BURST)
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .field("resume_after", &self.resume_after())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::sleep;

    // The token bucket runs on the wall clock, so pacing is measured with
    // real time.
    #[tokio::test]
    async fn test_burst_is_immediate_then_paced() {
        let limiter = RateLimiter::new(10, 3);
        let cancel = CancellationToken::new();
        let start = std::time::Instant::now();

        for _ in 0..3 {
            limiter.acquire(&cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(50));

        limiter.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_token_wait() {
        let limiter = RateLimiter::new(1, 1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = std::time::Instant::now();
        assert_eq!(limiter.acquire(&cancel).await, Err(Interrupted));
        assert!(start.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_acquire() {
        let limiter = RateLimiter::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        limiter.backoff(Duration::from_secs(3));
        limiter.acquire(&cancel).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_never_shortens_window() {
        let limiter = RateLimiter::default();
        limiter.backoff(Duration::from_secs(10));
        let long = limiter.resume_after().unwrap();

        limiter.backoff(Duration::from_secs(1));
        assert_eq!(limiter.resume_after(), Some(long));

        limiter.backoff(Duration::ZERO);
        assert_eq!(limiter.resume_after(), Some(long));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_beyond_clock_range_is_ignored() {
        let limiter = RateLimiter::default();

        limiter.backoff(Duration::from_secs(u64::MAX));

        assert_eq!(limiter.resume_after(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_share_window() {
        let limiter = Arc::new(RateLimiter::default());
        let cancel = CancellationToken::new();
        let start = Instant::now();
        limiter.backoff(Duration::from_secs(2));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    limiter.acquire(&cancel).await.unwrap();
                    Instant::now()
                })
            })
            .collect();

        for waiter in waiters {
            let released = waiter.await.unwrap();
            assert!(released.duration_since(start) >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff_wait() {
        let limiter = RateLimiter::default();
        let cancel = CancellationToken::new();
        limiter.backoff(Duration::from_secs(60));

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(limiter.acquire(&cancel).await, Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_fast() {
        let limiter = RateLimiter::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(limiter.acquire(&cancel).await, Err(Interrupted));
    }
}
