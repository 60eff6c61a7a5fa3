//! Movies & Anime API: scrape third-party listing sites and re-expose the
//! extracted data as a JSON HTTP API with an in-memory response cache.

pub mod adapters;
pub mod cache;
pub mod error;
pub mod server;
pub mod upstream;

pub use cache::CacheManager;
pub use error::{ApiError, ApiResult};
pub use server::{create_router, AppState};
pub use upstream::{PageClient, RateLimiter, RetryPolicy};
