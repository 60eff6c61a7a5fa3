//! Request pacing for upstream scrape targets.
//!
//! Third-party listing sites ban aggressive clients quickly, so every
//! upstream request first waits on this limiter. Two constraints apply:
//! a minimum spacing between consecutive requests (per-second budget) and
//! a sliding one-minute window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter with per-second and per-minute constraints
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum gap between consecutive requests
    min_interval: Duration,
    /// Maximum requests within the sliding one-minute window
    max_per_minute: usize,
    /// Timestamps of requests made within the current window
    window: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / max_per_second),
            max_per_minute: max_per_minute as usize,
            window: VecDeque::with_capacity(max_per_minute as usize),
        }
    }

    /// Wait until a request may be made, then record it
    pub async fn acquire(&mut self) {
        if let Some(wait) = self.required_wait(Instant::now()) {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit: pacing request");
            sleep(wait).await;
        }

        self.prune(Instant::now());
        self.window.push_back(Instant::now());
    }

    /// Requests recorded in the current one-minute window
    pub fn current_minute_count(&mut self) -> usize {
        self.prune(Instant::now());
        self.window.len()
    }

    /// How long to wait before the next request is allowed, if at all
    fn required_wait(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);

        let mut wait = Duration::ZERO;

        // Window constraint: wait for the oldest request to age out
        if self.window.len() >= self.max_per_minute {
            if let Some(&oldest) = self.window.front() {
                let age = now.duration_since(oldest);
                if age < WINDOW {
                    wait = wait.max(WINDOW - age);
                }
            }
        }

        // Spacing constraint against the most recent request
        if let Some(&last) = self.window.back() {
            let since_last = now.duration_since(last);
            if since_last < self.min_interval {
                wait = wait.max(self.min_interval - since_last);
            }
        }

        (wait > Duration::ZERO).then_some(wait)
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.window.front() {
            if now.duration_since(front) >= WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }
}
