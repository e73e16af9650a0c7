//! Per-client-key sliding-window rate limiter (spec §4.4 "Rate limiting").
//!
//! One `SlidingWindowLimiter` is owned by the `CommandExecutor`, not a
//! process global (spec §9 "Global state") — construction reads `max` and
//! `window` once, and every `try_acquire` call afterward is pure bookkeeping
//! behind a mutex.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Mutex;

pub struct SlidingWindowLimiter {
    max: usize,
    window: Duration,
    starts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            starts: Mutex::new(HashMap::new()),
        }
    }

    /// Prunes timestamps older than `window` for `client_key`, then admits
    /// the new attempt if the remaining count is below `max`. Returns
    /// `false` (and does not record the attempt) when the limit is hit.
    pub async fn try_acquire(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut starts = self.starts.lock().await;
        let entry = starts.entry(client_key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.max {
            return false;
        }
        entry.push(now);
        true
    }

    pub fn describe(&self) -> String {
        format!("{} commands per {} s", self.max, self.window.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_max_then_rejects() {
        let limiter = SlidingWindowLimiter::new(10, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(limiter.try_acquire("default").await);
        }
        assert!(!limiter.try_acquire("default").await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire("a").await);
        assert!(limiter.try_acquire("b").await);
        assert!(!limiter.try_acquire("a").await);
    }

    #[tokio::test]
    async fn old_entries_age_out_of_the_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.try_acquire("default").await);
        assert!(!limiter.try_acquire("default").await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.try_acquire("default").await);
    }
}
