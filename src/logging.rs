//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber`: an env-filtered fmt layer in one
//! of three output formats. Initialization is idempotent so tests and
//! embedding applications can call it freely.

use crate::error::ScanError;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed with colors, for development.
    Pretty,
    /// Single-line without colors, for production.
    Compact,
    /// JSON, for log aggregation.
    Json,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is not set.
    pub level: Level,
    /// Output format.
    pub format: OutputFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Options at the given level, compact format.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Parse a log level name (case-insensitive).
pub fn parse_level(level: &str) -> Result<Level, ScanError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(ScanError::InvalidSettings(format!(
            "invalid log level '{other}', expected trace, debug, info, warn or error"
        ))),
    }
}

/// Install the global subscriber. Safe to call more than once; a subscriber
/// installed earlier wins and the call reports success.
pub fn init(config: &LogConfig) -> Result<(), ScanError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => fmt::layer().pretty().with_filter(filter).boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(false)
            .with_filter(filter)
            .boxed(),
        OutputFormat::Json => fmt::layer().json().with_filter(filter).boxed(),
    };

    // A subscriber from a previous init (common in tests) is fine.
    let _ = tracing_subscriber::registry().with(layer).try_init();
    Ok(())
}
