// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::telemetry::{LoggingConfig, DEFAULT_MAX_ARGUMENT_ATTRIBUTES};

/// Where spans and metrics go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// `tracing` spans plus the in-process metrics registry.
    #[default]
    Tracing,
    /// Keep everything in memory.
    Memory,
}

impl ExporterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracing => "tracing",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExporterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tracing" => Ok(Self::Tracing),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid_value(
                "exporter",
                format!("unknown exporter '{other}' (expected 'tracing' or 'memory')"),
            )),
        }
    }
}

/// Instrumentation configuration, as found in a config file.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstrumentationConfig {
    /// Reported as the service emitting telemetry.
    pub service_name: String,

    pub service_version: String,

    pub exporter: ExporterKind,

    /// Record top-level scalar call arguments as span attributes.
    pub capture_arguments: bool,

    /// Cap on argument attributes per call.
    pub max_argument_attributes: usize,

    pub logging: LoggingConfig,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            exporter: ExporterKind::default(),
            capture_arguments: false,
            max_argument_attributes: DEFAULT_MAX_ARGUMENT_ATTRIBUTES,
            logging: LoggingConfig::default(),
        }
    }
}

impl InstrumentationConfig {
    /// Check values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "serviceName",
                "must not be empty",
            ));
        }
        if self.capture_arguments && self.max_argument_attributes == 0 {
            return Err(ConfigError::invalid_value(
                "maxArgumentAttributes",
                "must be greater than 0 when captureArguments is enabled",
            ));
        }
        Ok(())
    }
}
