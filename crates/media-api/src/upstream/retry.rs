//! Explicit retry policy for upstream fetches.
//!
//! One policy instance is built from configuration and consulted by the
//! page client on every request, so retry behavior is uniform across all
//! adapters rather than sprinkled per call site.

use std::time::Duration;

/// Retry policy with exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries after the first
    /// attempt, starting from `base_delay_ms` between attempts
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Total number of attempts, including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Whether another attempt is allowed after `attempt` (zero-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Backoff delay before retrying attempt number `attempt` (zero-based):
    /// doubles each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, 100);
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(3, 100);
        assert_eq!(policy.attempts(), 4);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, 100);
        assert_eq!(policy.attempts(), 1);
        assert!(!policy.should_retry(0));
    }
}
