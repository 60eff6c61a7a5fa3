//! Logging infrastructure for the Movies & Anime API.
//!
//! Console output for interactive runs plus daily-rotated file logs,
//! with noisy HTTP-stack internals demoted to warn.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            component: "media-api".to_string(),
            default_level: Level::INFO,
            console: true,
            file: true,
            json_format: false,
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// The filter defaults to the configured level for workspace crates and
/// can be overridden wholesale through `RUST_LOG`.
pub fn init(config: LogConfig) -> Result<()> {
    let log_dir = Path::new(&config.log_dir);
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "media_api={level},shared={level},hyper=warn,reqwest=warn,h2=warn",
            level = config.default_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(build_layers(&config, log_dir))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir,
        "Logging initialized"
    );

    Ok(())
}

/// Assemble the enabled output layers
fn build_layers<S>(config: &LogConfig, log_dir: &Path) -> Vec<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let mut layers: Vec<Box<dyn Layer<S> + Send + Sync>> = Vec::new();

    if config.console {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stdout)
                .boxed(),
        );
    }

    if config.file {
        let appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    layers
}
