//! Structured logging setup.
//!
//! Logs go to stderr so generated source printed to stdout stays clean. The filter
//! comes from `RUST_LOG` when set, else from the configured level. The format is
//! chosen by `HANDLERGEN_LOG_FORMAT` (`pretty` or `json`).

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for machine consumption, pretty-print for terminals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Fallback level when `RUST_LOG` is unset
    pub log_level: String,
    pub format: LogFormat,
    /// Include file and line number in each record
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `HANDLERGEN_LOG_LEVEL`, `HANDLERGEN_LOG_FORMAT` and `HANDLERGEN_LOG_LOCATION`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        LogConfig {
            log_level: env::var("HANDLERGEN_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("HANDLERGEN_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            include_location: env::var("HANDLERGEN_LOG_LOCATION")
                .ok()
                .and_then(|s| crate::config::parse_bool(&s))
                .unwrap_or(defaults.include_location),
        }
    }
}

fn parse_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once: later calls fail inside `try_init` and are reported
/// as an error the caller may ignore.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let level = parse_level(&config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
