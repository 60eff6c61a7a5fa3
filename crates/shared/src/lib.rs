//! Shared library for the Movies & Anime API.
//!
//! This crate provides functionality common to the whole workspace:
//! - Configuration management
//! - Data models and response envelopes
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;
