// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for MCP handler instrumentation.
//!
//! This module provides strongly-typed errors for the different parts of the crate,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Kind reported for failures that carry no more specific classifier.
pub const DEFAULT_ERROR_KIND: &str = "Error";

/// A failure raised by an application handler.
///
/// The instrumentation never creates these on its own; it only reads the
/// `kind` and `message` of a failure and hands the same value back to the caller.
#[derive(Error)]
#[error("{message}")]
pub struct HandlerError {
    kind: String,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl HandlerError {
    /// Create a handler error with an explicit kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error with the default `"Error"` kind.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(DEFAULT_ERROR_KIND, message)
    }

    /// Wrap an arbitrary error, classifying it by its type name.
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind: short_type_name::<E>().to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The failure's name/classifier.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The failure's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(err)
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Errors raised by a telemetry backend.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to derive argument attributes: {0}")]
    ArgumentAttributes(String),
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_msg() {
        let err = HandlerError::msg("Tool failed");
        assert_eq!(err.kind(), "Error");
        assert_eq!(err.message(), "Tool failed");
        assert_eq!(err.to_string(), "Tool failed");
    }

    #[test]
    fn test_handler_error_new() {
        let err = HandlerError::new("TypeError", "bad input");
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(err.message(), "bad input");
    }

    #[test]
    fn test_handler_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt");
        let err: HandlerError = io_err.into();
        assert_eq!(err.kind(), "Error");
        assert_eq!(err.message(), "missing.txt");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_handler_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: HandlerError = json_err.into();
        assert_eq!(err.kind(), "Error");
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_handler_error_kind_from_custom_type() {
        #[derive(Debug, Error)]
        #[error("quota exceeded")]
        struct QuotaExceeded;

        let err = HandlerError::from_error(QuotaExceeded);
        assert_eq!(err.kind(), "QuotaExceeded");
        assert_eq!(err.message(), "quota exceeded");
    }

    #[test]
    fn test_config_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let config_err: ConfigError = json_err.into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }
}
