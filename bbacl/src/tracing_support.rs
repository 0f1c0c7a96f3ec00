//! Tracing and logging support.
//!
//! Logs go to stderr so that reports on stdout stay machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TracingFormat {
    /// Multi-line, human-readable output.
    Pretty,

    /// One line per event.
    #[default]
    Compact,

    /// JSON lines, one object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG or defaults to "warn".
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Compact,
            timestamps: false,
            target: false,
        }
    }
}

impl TracingConfig {
    /// Level for a `-v` count: none, debug, then trace.
    pub fn level_for_verbosity(verbose: u8) -> Option<tracing::Level> {
        match verbose {
            0 => None,
            1 => Some(tracing::Level::DEBUG),
            _ => Some(tracing::Level::TRACE),
        }
    }
}

fn build_filter(level: Option<tracing::Level>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

fn build_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target);

    match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

/// Install the global subscriber.
///
/// Calling this twice is a no-op; the first subscriber stays installed.
pub fn init_subscriber_with_config(config: TracingConfig) {
    let _ = tracing_subscriber::registry()
        .with(build_layer(&config))
        .with(build_filter(config.level))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert!(config.level.is_none());
        assert_eq!(config.format, TracingFormat::Compact);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TracingConfig::level_for_verbosity(0), None);
        assert_eq!(
            TracingConfig::level_for_verbosity(1),
            Some(tracing::Level::DEBUG)
        );
        assert_eq!(
            TracingConfig::level_for_verbosity(5),
            Some(tracing::Level::TRACE)
        );
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_subscriber_with_config(TracingConfig::default());
        init_subscriber_with_config(TracingConfig {
            format: TracingFormat::Json,
            ..Default::default()
        });
    }
}
