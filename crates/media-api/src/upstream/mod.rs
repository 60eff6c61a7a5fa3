//! Upstream HTTP plumbing: rate-limited, retrying page fetches.

mod client;
mod rate_limiter;
mod retry;

pub use client::PageClient;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
