//! Shared application state passed to all route handlers.
//!
//! The cache manager is owned here and injected through state rather than
//! living in a module-level global, so tests can build an isolated state
//! per router.

use crate::adapters::{AnimeSite, MovieSite};
use crate::cache::CacheManager;
use crate::upstream::{PageClient, RetryPolicy};
use anyhow::{Context, Result};
use shared::Config;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,

    /// Response cache
    pub cache: Arc<CacheManager>,

    /// Movies/TV site adapter
    pub movies: MovieSite,

    /// Anime site adapter
    pub anime: AnimeSite,
}

impl AppState {
    /// Build application state from configuration
    pub fn new(config: Config) -> Result<Self> {
        let retry = RetryPolicy::new(config.upstream.max_retries, config.upstream.retry_delay_ms);
        let client = Arc::new(
            PageClient::new(config.request_timeout(), &config.upstream.rate_limit, retry)
                .context("Failed to create upstream client")?,
        );

        let cache = Arc::new(CacheManager::new(config.cache_ttl(), config.cache.max_entries));
        let movies = MovieSite::new(Arc::clone(&client), config.upstream.movies_base_url.clone());
        let anime = AnimeSite::new(client, config.upstream.anime_base_url.clone());

        Ok(Self {
            config: Arc::new(config),
            cache,
            movies,
            anime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_default_config() {
        let state = AppState::new(Config::default()).unwrap();
        assert_eq!(state.cache.size(), 0);
        assert_eq!(state.config.server.port, 8080);
    }
}
