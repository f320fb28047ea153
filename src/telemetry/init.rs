// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging initialization and configuration.

use std::io;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Configuration for logging initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default log level if RUST_LOG is not set.
    pub level: String,

    /// Whether to log span close events (carries span fields and timing).
    pub span_events: bool,

    /// Whether to include file/line information.
    pub file_line: bool,

    /// Whether to include target module path.
    pub target: bool,

    /// Whether to use ANSI colors in output.
    pub ansi: bool,

    /// Whether to use compact log format.
    pub compact: bool,

    /// Custom filter directive (overrides level and RUST_LOG).
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            span_events: false,
            file_line: false,
            target: true,
            ansi: true,
            compact: true,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create a config suitable for development with verbose output.
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            span_events: true,
            file_line: true,
            target: true,
            ansi: true,
            compact: false,
            filter: None,
        }
    }

    /// Create a config for testing with trace-level output.
    pub fn testing() -> Self {
        Self {
            level: "trace".to_string(),
            span_events: true,
            file_line: true,
            target: true,
            ansi: false,
            compact: false,
            filter: Some("mcp_instrumentation=trace".to_string()),
        }
    }

    /// Set the default log level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set a custom filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directive) => {
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(&self.level))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.level)),
        }
    }
}

/// Guard returned by [`init_logging`].
///
/// Keep this guard alive for the duration of your program.
pub struct LoggingGuard {
    _private: (),
}

/// Install the global `tracing` subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    let filter = config.env_filter();

    // Span close events carry the recorded otel.* fields and timing
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.target)
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_span_events(span_events);

    if config.compact {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.compact())
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    }

    Ok(LoggingGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.ansi);
        assert!(config.compact);
    }

    #[test]
    fn test_logging_config_development() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, "debug");
        assert!(config.span_events);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_level("debug")
            .with_filter("mcp_instrumentation=trace")
            .with_ansi(false);

        assert_eq!(config.level, "debug");
        assert_eq!(config.filter, Some("mcp_instrumentation=trace".to_string()));
        assert!(!config.ansi);
    }

    #[test]
    fn test_logging_config_partial_yaml() {
        let config: LoggingConfig = serde_yaml::from_str("level: warn\ncompact: false\n").unwrap();
        assert_eq!(config.level, "warn");
        assert!(!config.compact);
        assert!(config.ansi);
    }
}
