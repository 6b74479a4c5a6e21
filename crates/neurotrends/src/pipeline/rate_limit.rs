//! Sliding-window admission gate for outbound classification calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::defaults;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Start at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self { now: Arc::new(Mutex::new(Instant::now())) }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admits at most `capacity` calls in any trailing window.
///
/// Entries are evicted once they are strictly older than the window, so a
/// closed window of that length never holds more than `capacity` admissions.
/// Waiters poll; there is no fairness between them.
#[derive(Debug)]
pub struct SlidingWindowLimiter<C = SystemClock> {
    capacity: usize,
    window: Duration,
    poll_interval: Duration,
    clock: C,
    admitted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter<SystemClock> {
    /// `calls_per_minute` admissions per 60-second window on the wall clock.
    #[must_use]
    pub fn per_minute(calls_per_minute: usize) -> Self {
        Self::with_clock(calls_per_minute, defaults::RATE_WINDOW, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter with an explicit window and clock.
    ///
    /// A `capacity` of zero is raised to one so `acquire` can always finish.
    #[must_use]
    pub fn with_clock(capacity: usize, window: Duration, clock: C) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            poll_interval: defaults::RATE_POLL,
            clock,
            admitted: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Override the interval slept while saturated.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Admissions allowed per window.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evict expired entries and, if there is room, record an admission.
    ///
    /// Check and record happen under one lock.
    pub fn try_admit(&self) -> bool {
        let mut admitted = self.admitted.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        while let Some(&oldest) = admitted.front() {
            if now.saturating_duration_since(oldest) > self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < self.capacity {
            admitted.push_back(now);
            true
        } else {
            false
        }
    }

    /// Wait until a call is admitted.
    pub async fn acquire(&self) {
        let mut waited = 0u32;
        while !self.try_admit() {
            if waited == 0 {
                tracing::debug!(capacity = self.capacity, "Rate limit window full, waiting");
            }
            waited = waited.saturating_add(1);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Admissions currently inside the window (expired entries included until the next admit).
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.admitted.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_capacity() {
        let clock = ManualClock::new();
        let limiter = SlidingWindowLimiter::with_clock(3, Duration::from_secs(60), clock.clone());

        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
        assert!(!limiter.try_admit());
        assert_eq!(limiter.in_flight(), 3);
    }

    #[test]
    fn test_entries_expire_strictly_after_window() {
        let clock = ManualClock::new();
        let limiter = SlidingWindowLimiter::with_clock(1, Duration::from_secs(60), clock.clone());

        assert!(limiter.try_admit());
        clock.advance(Duration::from_secs(60));
        assert!(!limiter.try_admit(), "an entry exactly one window old still counts");
        clock.advance(Duration::from_millis(1));
        assert!(limiter.try_admit());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let limiter = SlidingWindowLimiter::with_clock(0, Duration::from_secs(60), ManualClock::new());
        assert_eq!(limiter.capacity(), 1);
        assert!(limiter.try_admit());
    }

    #[tokio::test]
    async fn test_acquire_waits_until_window_slides() {
        let clock = ManualClock::new();
        let limiter = Arc::new(
            SlidingWindowLimiter::with_clock(1, Duration::from_secs(60), clock.clone())
                .with_poll_interval(Duration::from_millis(10)),
        );
        limiter.acquire().await;

        let waiter = tokio::spawn({
            let limiter = Arc::clone(&limiter);
            async move { limiter.acquire().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        clock.advance(Duration::from_secs(61));
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("admitted once the window slid")
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_acquirers_share_the_window() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        async fn settle_at(admitted: &AtomicUsize, expected: usize) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while admitted.load(Ordering::SeqCst) < expected {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("waiters admitted");
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(admitted.load(Ordering::SeqCst), expected);
        }

        let clock = ManualClock::new();
        let limiter = Arc::new(
            SlidingWindowLimiter::with_clock(3, Duration::from_secs(60), clock.clone())
                .with_poll_interval(Duration::from_millis(5)),
        );
        let admitted = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let admitted = Arc::clone(&admitted);
            tasks.push(tokio::spawn(async move {
                limiter.acquire().await;
                admitted.fetch_add(1, Ordering::SeqCst);
            }));
        }

        settle_at(&admitted, 3).await;
        clock.advance(Duration::from_secs(61));
        settle_at(&admitted, 6).await;
        clock.advance(Duration::from_secs(61));
        settle_at(&admitted, 8).await;

        for task in tasks {
            task.await.unwrap();
        }
    }
}
