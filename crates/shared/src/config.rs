//! Configuration management for the Movies & Anime API.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Upstream scraping settings
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Public base URL used when generating per-episode links
    pub public_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl LoggingConfig {
    /// Configured level as a [`tracing::Level`], falling back to INFO on
    /// an unrecognized value
    pub fn level(&self) -> tracing::Level {
        self.default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cached responses, in seconds
    pub ttl_seconds: u64,

    /// Maximum number of cached responses held at once
    pub max_entries: usize,
}

/// Upstream scraping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the movies/TV listing site
    pub movies_base_url: String,

    /// Base URL of the anime listing site
    pub anime_base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Base retry delay in milliseconds (doubled per attempt)
    pub retry_delay_ms: u64,

    /// Rate limiting settings for upstream requests
    pub rate_limit: RateLimitConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                public_url: "http://127.0.0.1:8080".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            cache: CacheConfig {
                ttl_seconds: 300,
                max_entries: 1000,
            },
            upstream: UpstreamConfig {
                movies_base_url: "https://lookmoviess.com".to_string(),
                anime_base_url: "https://gogoanime.lu".to_string(),
                request_timeout_seconds: 10,
                max_retries: 3,
                retry_delay_ms: 1000,
                rate_limit: RateLimitConfig {
                    requests_per_second: 2.0,
                    requests_per_minute: 50,
                },
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Cache TTL as a [`Duration`]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// Upstream request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_seconds)
    }
}
