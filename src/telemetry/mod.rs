// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry capability consumed by the handler instrumentation.
//!
//! The instrumentation itself never exports anything. It talks to a
//! [`Telemetry`] implementation, which owns span creation, metric handles and
//! argument-derived attributes:
//!
//! - [`TracingTelemetry`] - spans are `tracing` spans, metrics land in an
//!   in-process [`Metrics`] registry
//! - [`InMemoryTelemetry`] - records everything for inspection (tests, demos)
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_instrumentation::telemetry::{init_logging, LoggingConfig, TracingTelemetry};
//!
//! let _guard = init_logging(&LoggingConfig::default())?;
//! let telemetry = Arc::new(TracingTelemetry::global());
//! ```

mod attributes;
mod correlation;
mod init;
pub mod memory;
pub mod metrics;
mod runtime;
mod spans;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use attributes::{AttributeValue, Attributes};
pub use correlation::{
    CorrelationId, RequestIdGenerator, SequentialIdGenerator, UuidGenerator,
};
#[cfg(test)]
pub use correlation::MockRequestIdGenerator;
pub use init::{init_logging, LoggingConfig, LoggingGuard};
pub use memory::{HistogramSample, InMemoryTelemetry, SpanData};
pub use metrics::{
    Histogram, Metrics, MetricsSnapshot, SeriesMetrics, ERROR_TYPE_ATTRIBUTE, GLOBAL_METRICS,
};
pub use runtime::{ProcessRuntimeInfo, RuntimeInfo, RuntimeInfoSource};
pub use spans::{TracingSpan, TracingTelemetry};

use crate::error::TelemetryError;
use crate::instrumentation::HandlerResult;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Attribute key prefix for argument-derived attributes.
pub const ARGUMENT_ATTRIBUTE_PREFIX: &str = "mcp.request.argument.";

/// Default cap on argument-derived attributes per call.
pub const DEFAULT_MAX_ARGUMENT_ATTRIBUTES: usize = 16;

/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { message: String },
}

impl SpanStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// OpenTelemetry status code name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error { .. } => "ERROR",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// Description and unit of a metric instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentOptions {
    pub description: String,
    pub unit: String,
}

impl InstrumentOptions {
    pub fn new(description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            unit: unit.into(),
        }
    }
}

/// A started span.
pub trait TelemetrySpan: Send + Sync {
    fn set_status(&self, status: SpanStatus);

    fn set_attribute(&self, key: &str, value: AttributeValue);

    /// Make this span the active one while `future` runs.
    fn attach<'a>(&self, future: BoxFuture<'a, HandlerResult>) -> BoxFuture<'a, HandlerResult> {
        future
    }

    /// End the span. Consumes the handle, so a span ends at most once.
    fn end(self: Box<Self>);
}

/// Reusable histogram handle.
pub trait HistogramRecorder: Send + Sync {
    fn record(&self, value: f64, attributes: &Attributes);
}

/// Reusable monotonic counter handle.
pub trait CounterRecorder: Send + Sync {
    fn add(&self, amount: u64);
}

/// Telemetry backend capability.
pub trait Telemetry: Send + Sync {
    /// Start a span with the given attributes.
    fn start_span(&self, name: &str, attributes: &Attributes) -> Box<dyn TelemetrySpan>;

    /// Acquire a histogram handle.
    fn histogram(&self, name: &str, options: InstrumentOptions) -> Arc<dyn HistogramRecorder>;

    /// Acquire a counter handle.
    fn increment_counter(&self, name: &str, options: InstrumentOptions)
        -> Arc<dyn CounterRecorder>;

    /// Derive extra span attributes from call parameters.
    fn argument_attributes(
        &self,
        _params: &serde_json::Value,
    ) -> Result<Attributes, TelemetryError> {
        Ok(Attributes::new())
    }
}

/// Flatten the top-level scalar fields of an object parameter into
/// `mcp.request.argument.<key>` attributes, keeping at most `limit`.
pub fn scalar_argument_attributes(params: &serde_json::Value, limit: usize) -> Attributes {
    let Some(object) = params.as_object() else {
        return Attributes::new();
    };

    object
        .iter()
        .filter_map(|(key, value)| {
            AttributeValue::from_json(value)
                .map(|value| (format!("{ARGUMENT_ATTRIBUTE_PREFIX}{key}"), value))
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_span_status_codes() {
        assert_eq!(SpanStatus::Unset.code(), "UNSET");
        assert_eq!(SpanStatus::Ok.code(), "OK");
        let err = SpanStatus::error("Tool failed");
        assert_eq!(err.code(), "ERROR");
        assert_eq!(err.message(), Some("Tool failed"));
        assert_eq!(SpanStatus::Ok.message(), None);
    }

    #[test]
    fn test_scalar_argument_attributes() {
        let attrs = scalar_argument_attributes(
            &json!({"operation": "add", "a": 2, "nested": {"x": 1}, "list": [1, 2]}),
            16,
        );

        assert_eq!(attrs.get_str("mcp.request.argument.operation"), Some("add"));
        assert_eq!(
            attrs.get("mcp.request.argument.a"),
            Some(&AttributeValue::Int(2))
        );
        assert!(!attrs.contains_key("mcp.request.argument.nested"));
        assert!(!attrs.contains_key("mcp.request.argument.list"));
    }

    #[test]
    fn test_scalar_argument_attributes_limit_and_non_object() {
        let attrs = scalar_argument_attributes(&json!({"a": 1, "b": 2, "c": 3}), 2);
        assert_eq!(attrs.len(), 2);

        assert!(scalar_argument_attributes(&json!("text"), 16).is_empty());
        assert!(scalar_argument_attributes(&serde_json::Value::Null, 16).is_empty());
    }
}
