//! Sliding-window rate limiter
//!
//! Keeps the exact timestamps of the requests admitted during the last window.
//! A request is admitted only while fewer than `max_requests` timestamps are
//! younger than `window`; otherwise the caller sleeps until the oldest one ages
//! out. The lock is held across that sleep, so waiters are admitted in arrival
//! order (tokio's mutex is FIFO).

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Exact sliding-window limiter, shared by reference (`Arc`) between workers
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    admitted: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// `max_requests` is clamped to at least 1
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a free slot, record it and return the admission time
    pub async fn acquire(&self) -> Instant {
        let mut admitted = self.admitted.lock().await;

        loop {
            let now = Instant::now();
            Self::evict(&mut admitted, now, self.window);

            if admitted.len() < self.max_requests {
                admitted.push_back(now);
                return now;
            }

            // Full: the front entry is the next to leave the window
            if let Some(&oldest) = admitted.front() {
                let until = oldest + self.window;
                tracing::debug!(
                    wait_ms = until.saturating_duration_since(now).as_millis() as u64,
                    in_window = admitted.len(),
                    "Rate limiting: waiting for window slot"
                );
                tokio::time::sleep_until(until).await;
            }
        }
    }

    /// Number of admissions still inside the window
    pub async fn in_window(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        Self::evict(&mut admitted, Instant::now(), self.window);
        admitted.len()
    }

    fn evict(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&front) = admitted.front() {
            if now.saturating_duration_since(front) >= window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
