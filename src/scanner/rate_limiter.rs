//! Request pacing
//!
//! The limiter gates the *start* of each request: the next request may not
//! begin until the configured delay has passed since the previous one began.
//! Time spent waiting on the network therefore counts toward the delay, and a
//! slow response adds no extra pause.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of time for the limiter, swappable in tests
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// Wall clock backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Clock that only moves when told to
///
/// `sleep` returns immediately after advancing the clock by the requested
/// amount and records the duration, so pacing can be asserted exactly.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    origin: Instant,
    inner: std::sync::Mutex<ManualClockState>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct ManualClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            inner: std::sync::Mutex::new(ManualClockState::default()),
        }
    }

    /// Moves the clock forward, e.g. to simulate request latency
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.offset += duration;
    }

    /// Every duration passed to `sleep` so far
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.sleeps.clone()
    }

    pub fn elapsed(&self) -> Duration {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.offset
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Enforces a minimum interval between request starts
#[derive(Debug)]
pub struct RateLimiter<C = TokioClock> {
    interval: Duration,
    last_start: Option<Instant>,
    clock: C,
}

impl RateLimiter<TokioClock> {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, TokioClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        Self {
            interval,
            last_start: None,
            clock,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before the next request may start, or `None` if it may
    /// start now
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_start?;
        let ready_at = last + self.interval;
        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }

    /// Waits until a request may start and marks it as started
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&mut self) -> Duration {
        let waited = match self.time_until_ready(self.clock.now()) {
            Some(wait) => {
                tracing::trace!("Rate limiter holding request for {:?}", wait);
                self.clock.sleep(wait).await;
                wait
            }
            None => Duration::ZERO,
        };

        self.last_start = Some(self.clock.now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(1), clock.clone());

        assert_eq!(limiter.acquire().await, Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_gap_between_starts() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(1), clock.clone());

        limiter.acquire().await;
        let first_start = clock.now();

        // negligible request latency
        clock.advance(Duration::from_millis(5));

        let waited = limiter.acquire().await;
        let second_start = clock.now();

        assert_eq!(waited, Duration::from_millis(995));
        assert!(second_start - first_start >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_slow_request_adds_no_delay() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(1), clock.clone());

        limiter.acquire().await;
        clock.advance(Duration::from_millis(1500));

        assert_eq!(limiter.acquire().await, Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_zero_interval() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::with_clock(Duration::ZERO, clock.clone());

        for _ in 0..3 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_time_until_ready() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(2), TokioClock);
        let now = clock.now();
        assert_eq!(limiter.interval(), Duration::from_secs(2));

        assert_eq!(limiter.time_until_ready(now), None);

        limiter.last_start = Some(now);
        assert_eq!(
            limiter.time_until_ready(now + Duration::from_millis(500)),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(limiter.time_until_ready(now + Duration::from_secs(2)), None);
    }

    #[tokio::test]
    async fn test_tokio_clock_sleeps() {
        let mut limiter = RateLimiter::new(Duration::from_millis(30));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
