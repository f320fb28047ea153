// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Instrumentation configuration.
//!
//! Loaded from a JSON or YAML file, then overridden from the environment:
//! - `MCP_SERVICE_NAME`, `MCP_SERVICE_VERSION`
//! - `MCP_EXPORTER` (`tracing` or `memory`)
//! - `MCP_CAPTURE_ARGUMENTS`

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, apply_overrides, load_config, load_config_file, CAPTURE_ARGUMENTS_ENV,
    EXPORTER_ENV, SERVICE_NAME_ENV, SERVICE_VERSION_ENV,
};
pub use types::{ExporterKind, InstrumentationConfig};

use std::sync::Arc;

use tracing::info;

use crate::telemetry::{InMemoryTelemetry, MetricsSnapshot, Telemetry, TracingTelemetry};

/// A configured telemetry backend.
#[derive(Debug, Clone)]
pub enum TelemetryBackend {
    Tracing(TracingTelemetry),
    Memory(InMemoryTelemetry),
}

impl TelemetryBackend {
    /// The backend as the capability the instrumentation consumes.
    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        match self {
            Self::Tracing(telemetry) => Arc::new(telemetry.clone()),
            Self::Memory(telemetry) => Arc::new(telemetry.clone()),
        }
    }

    /// Current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        match self {
            Self::Tracing(telemetry) => telemetry.metrics().snapshot(),
            Self::Memory(telemetry) => telemetry.snapshot(),
        }
    }

    pub fn kind(&self) -> ExporterKind {
        match self {
            Self::Tracing(_) => ExporterKind::Tracing,
            Self::Memory(_) => ExporterKind::Memory,
        }
    }
}

/// Build the telemetry backend described by `config`.
pub fn build_telemetry(config: &InstrumentationConfig) -> TelemetryBackend {
    info!(
        service = %config.service_name,
        version = %config.service_version,
        exporter = %config.exporter,
        capture_arguments = config.capture_arguments,
        "Building telemetry"
    );

    match config.exporter {
        ExporterKind::Tracing => TelemetryBackend::Tracing(
            TracingTelemetry::new()
                .with_argument_capture(config.capture_arguments, config.max_argument_attributes),
        ),
        ExporterKind::Memory => {
            let telemetry = InMemoryTelemetry::new();
            TelemetryBackend::Memory(if config.capture_arguments {
                telemetry.with_scalar_arguments(config.max_argument_attributes)
            } else {
                telemetry
            })
        }
    }
}
