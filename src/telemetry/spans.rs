// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `tracing`-backed telemetry.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, field::Empty, info, info_span, Instrument, Span};

use super::metrics::{Metrics, GLOBAL_METRICS};
use super::{
    scalar_argument_attributes, AttributeValue, Attributes, BoxFuture, CounterRecorder,
    HistogramRecorder, InstrumentOptions, SpanStatus, Telemetry, TelemetrySpan,
    DEFAULT_MAX_ARGUMENT_ATTRIBUTES,
};
use crate::error::TelemetryError;
use crate::instrumentation::HandlerResult;

/// Attribute keys declared as span fields. Other keys only appear in the
/// `attributes` field and as debug events.
const SPAN_FIELDS: &[&str] = &[
    "mcp.method.name",
    "mcp.request.id",
    "client.address",
    "client.port",
    "error.type",
];

/// A `tracing` span with OpenTelemetry-style status fields.
pub struct TracingSpan {
    span: Span,
    start: Instant,
}

impl TracingSpan {
    /// Start a new span.
    pub fn start(name: &str, attributes: &Attributes) -> Self {
        let span = info_span!(
            "mcp",
            "otel.name" = %name,
            "otel.kind" = "server",
            "otel.status_code" = Empty,
            "otel.status_message" = Empty,
            "mcp.method.name" = Empty,
            "mcp.request.id" = Empty,
            "client.address" = Empty,
            "client.port" = Empty,
            "error.type" = Empty,
            "duration_ms" = Empty,
            attributes = %attributes,
        );

        for (key, value) in attributes.iter() {
            if SPAN_FIELDS.contains(&key) {
                record_attribute(&span, key, value);
            }
        }

        Self {
            span,
            start: Instant::now(),
        }
    }

    /// Get the underlying tracing span.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

fn record_attribute(span: &Span, key: &str, value: &AttributeValue) {
    match value {
        AttributeValue::Bool(b) => span.record(key, *b),
        AttributeValue::Int(i) => span.record(key, *i),
        AttributeValue::Float(f) => span.record(key, *f),
        AttributeValue::String(s) => span.record(key, s.as_str()),
    };
}

impl TelemetrySpan for TracingSpan {
    fn set_status(&self, status: SpanStatus) {
        self.span.record("otel.status_code", status.code());
        if let Some(message) = status.message() {
            self.span.record("otel.status_message", message);
        }
    }

    fn set_attribute(&self, key: &str, value: AttributeValue) {
        if SPAN_FIELDS.contains(&key) {
            record_attribute(&self.span, key, &value);
        } else {
            debug!(parent: &self.span, attribute = key, value = %value, "Span attribute");
        }
    }

    fn attach<'a>(&self, future: BoxFuture<'a, HandlerResult>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(future.instrument(self.span.clone()))
    }

    fn end(self: Box<Self>) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.span.record("duration_ms", duration_ms);

        info!(parent: &self.span, "MCP operation complete");
    }
}

/// Telemetry that emits `tracing` spans and records metrics in-process.
#[derive(Debug, Clone)]
pub struct TracingTelemetry {
    metrics: Arc<Metrics>,
    capture_arguments: bool,
    max_argument_attributes: usize,
}

impl TracingTelemetry {
    /// Create telemetry with its own metrics registry.
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(Metrics::new()))
    }

    /// Create telemetry recording into [`GLOBAL_METRICS`].
    pub fn global() -> Self {
        Self::with_metrics(Arc::clone(&GLOBAL_METRICS))
    }

    /// Create telemetry recording into the given registry.
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            capture_arguments: false,
            max_argument_attributes: DEFAULT_MAX_ARGUMENT_ATTRIBUTES,
        }
    }

    /// Enable or disable argument attribute capture.
    pub fn with_argument_capture(mut self, enabled: bool, limit: usize) -> Self {
        self.capture_arguments = enabled;
        self.max_argument_attributes = limit;
        self
    }

    /// The metrics registry this telemetry records into.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for TracingTelemetry {
    fn start_span(&self, name: &str, attributes: &Attributes) -> Box<dyn TelemetrySpan> {
        Box::new(TracingSpan::start(name, attributes))
    }

    fn histogram(&self, name: &str, options: InstrumentOptions) -> Arc<dyn HistogramRecorder> {
        debug!(metric = name, unit = %options.unit, "Histogram acquired");
        Arc::new(self.metrics.histogram(name))
    }

    fn increment_counter(
        &self,
        name: &str,
        options: InstrumentOptions,
    ) -> Arc<dyn CounterRecorder> {
        debug!(metric = name, unit = %options.unit, "Counter acquired");
        Arc::new(self.metrics.counter(name, options))
    }

    fn argument_attributes(
        &self,
        params: &serde_json::Value,
    ) -> Result<Attributes, TelemetryError> {
        if !self.capture_arguments {
            return Ok(Attributes::new());
        }
        Ok(scalar_argument_attributes(
            params,
            self.max_argument_attributes,
        ))
    }
}
