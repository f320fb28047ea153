// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry that keeps every span, sample and counter in memory.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::metrics::{series_key, MetricsSnapshot, SeriesMetrics, ERROR_TYPE_ATTRIBUTE};
use super::{
    scalar_argument_attributes, AttributeValue, Attributes, BoxFuture, CounterRecorder,
    HistogramRecorder, InstrumentOptions, SpanStatus, Telemetry, TelemetrySpan,
};
use crate::error::TelemetryError;
use crate::instrumentation::HandlerResult;

type ArgumentAttributesFn =
    dyn Fn(&serde_json::Value) -> Result<Attributes, TelemetryError> + Send + Sync;

/// A recorded span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    pub name: String,
    pub attributes: Attributes,
    pub status: SpanStatus,
    /// Whether a handler future ran with this span active.
    pub attached: bool,
    pub ended: bool,
    pub duration_ms: Option<f64>,
}

/// A recorded histogram sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    pub name: String,
    pub value: f64,
    pub attributes: Attributes,
}

#[derive(Debug, Default)]
struct Store {
    spans: Vec<SpanData>,
    samples: Vec<HistogramSample>,
    counters: HashMap<String, u64>,
    instruments: Vec<(String, InstrumentOptions)>,
    /// Bumped by `reset`, so span handles from before a reset go stale.
    generation: u64,
}

/// In-memory telemetry for tests and demos.
#[derive(Clone)]
pub struct InMemoryTelemetry {
    store: Arc<Mutex<Store>>,
    argument_attributes: Option<Arc<ArgumentAttributesFn>>,
    started: Instant,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self {
            store: Arc::default(),
            argument_attributes: None,
            started: Instant::now(),
        }
    }

    /// Derive argument attributes from top-level scalar params.
    pub fn with_scalar_arguments(self, limit: usize) -> Self {
        self.with_argument_attributes(move |params| Ok(scalar_argument_attributes(params, limit)))
    }

    /// Derive argument attributes with a custom function.
    pub fn with_argument_attributes<F>(mut self, derive: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<Attributes, TelemetryError> + Send + Sync + 'static,
    {
        self.argument_attributes = Some(Arc::new(derive));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All spans in start order, ended or not.
    pub fn spans(&self) -> Vec<SpanData> {
        self.lock().spans.clone()
    }

    /// Spans that have ended.
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.lock().spans.iter().filter(|s| s.ended).cloned().collect()
    }

    /// Spans with the given name.
    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.lock()
            .spans
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// All histogram samples in record order.
    pub fn histogram_samples(&self) -> Vec<HistogramSample> {
        self.lock().samples.clone()
    }

    /// Current total of a counter, zero if never incremented.
    pub fn counter_value(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Every histogram/counter acquisition, in order.
    pub fn instruments(&self) -> Vec<(String, InstrumentOptions)> {
        self.lock().instruments.clone()
    }

    /// Aggregate the recorded samples and counters the way [`Metrics`](super::Metrics) does.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let store = self.lock();

        let mut series: BTreeMap<String, SeriesMetrics> = BTreeMap::new();
        for sample in &store.samples {
            let error_type = sample
                .attributes
                .get_str(ERROR_TYPE_ATTRIBUTE)
                .map(String::from);
            series
                .entry(series_key(&sample.name, &sample.attributes))
                .or_insert_with(|| SeriesMetrics::new(&sample.name))
                .record(sample.value, error_type);
        }

        MetricsSnapshot {
            counters: store
                .counters
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
            series,
            uptime_ms: self.started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        let mut store = self.lock();
        store.spans.clear();
        store.samples.clear();
        store.counters.clear();
        store.instruments.clear();
        store.generation += 1;
    }
}

impl Default for InMemoryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.lock();
        f.debug_struct("InMemoryTelemetry")
            .field("spans", &store.spans.len())
            .field("samples", &store.samples.len())
            .field("counters", &store.counters)
            .finish()
    }
}

impl Telemetry for InMemoryTelemetry {
    fn start_span(&self, name: &str, attributes: &Attributes) -> Box<dyn TelemetrySpan> {
        let mut store = self.lock();
        store.spans.push(SpanData {
            name: name.to_string(),
            attributes: attributes.clone(),
            status: SpanStatus::Unset,
            attached: false,
            ended: false,
            duration_ms: None,
        });
        Box::new(MemorySpan {
            index: store.spans.len() - 1,
            generation: store.generation,
            store: Arc::clone(&self.store),
            start: Instant::now(),
        })
    }

    fn histogram(&self, name: &str, options: InstrumentOptions) -> Arc<dyn HistogramRecorder> {
        self.lock().instruments.push((name.to_string(), options));
        Arc::new(MemoryHistogram {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        })
    }

    fn increment_counter(
        &self,
        name: &str,
        options: InstrumentOptions,
    ) -> Arc<dyn CounterRecorder> {
        self.lock().instruments.push((name.to_string(), options));
        Arc::new(MemoryCounter {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        })
    }

    fn argument_attributes(
        &self,
        params: &serde_json::Value,
    ) -> Result<Attributes, TelemetryError> {
        match &self.argument_attributes {
            Some(derive) => derive(params),
            None => Ok(Attributes::new()),
        }
    }
}

struct MemorySpan {
    index: usize,
    generation: u64,
    store: Arc<Mutex<Store>>,
    start: Instant,
}

impl MemorySpan {
    fn update(&self, f: impl FnOnce(&mut SpanData)) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if store.generation != self.generation {
            return;
        }
        if let Some(span) = store.spans.get_mut(self.index) {
            f(span);
        }
    }
}

impl TelemetrySpan for MemorySpan {
    fn set_status(&self, status: SpanStatus) {
        self.update(|span| span.status = status);
    }

    fn set_attribute(&self, key: &str, value: AttributeValue) {
        self.update(|span| span.attributes.insert(key, value));
    }

    fn attach<'a>(&self, future: BoxFuture<'a, HandlerResult>) -> BoxFuture<'a, HandlerResult> {
        self.update(|span| span.attached = true);
        future
    }

    fn end(self: Box<Self>) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.update(|span| {
            span.ended = true;
            span.duration_ms = Some(duration_ms);
        });
    }
}

struct MemoryHistogram {
    name: String,
    store: Arc<Mutex<Store>>,
}

impl HistogramRecorder for MemoryHistogram {
    fn record(&self, value: f64, attributes: &Attributes) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.samples.push(HistogramSample {
            name: self.name.clone(),
            value,
            attributes: attributes.clone(),
        });
    }
}

struct MemoryCounter {
    name: String,
    store: Arc<Mutex<Store>>,
}

impl CounterRecorder for MemoryCounter {
    fn add(&self, amount: u64) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        *store.counters.entry(self.name.clone()).or_insert(0) += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_span_recording() {
        let telemetry = InMemoryTelemetry::new();
        let span = telemetry.start_span("tools/call calc", &Attributes::new().with("a", 1i64));
        span.set_status(SpanStatus::Ok);
        span.set_attribute("b", "x".into());

        assert_eq!(telemetry.finished_spans().len(), 0);
        span.end();

        let spans = telemetry.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, SpanStatus::Ok);
        assert_eq!(spans[0].attributes.get_str("b"), Some("x"));
        assert!(spans[0].duration_ms.is_some());
    }

    #[test]
    fn test_metrics_recording() {
        let telemetry = InMemoryTelemetry::new();
        let counter = telemetry.increment_counter("c", InstrumentOptions::new("d", "calls"));
        let histogram = telemetry.histogram("h", InstrumentOptions::new("d", "ms"));

        counter.add(2);
        counter.add(1);
        histogram.record(1.5, &Attributes::new());

        assert_eq!(telemetry.counter_value("c"), 3);
        assert_eq!(telemetry.counter_value("missing"), 0);
        assert_eq!(telemetry.histogram_samples().len(), 1);
        assert_eq!(telemetry.instruments().len(), 2);
    }

    #[test]
    fn test_argument_attributes_hooks() {
        let plain = InMemoryTelemetry::new();
        assert!(plain.argument_attributes(&json!({"a": 1})).unwrap().is_empty());

        let scalar = InMemoryTelemetry::new().with_scalar_arguments(8);
        let attrs = scalar.argument_attributes(&json!({"a": 1})).unwrap();
        assert!(attrs.contains_key("mcp.request.argument.a"));

        let failing = InMemoryTelemetry::new().with_argument_attributes(|_| {
            Err(TelemetryError::ArgumentAttributes("boom".to_string()))
        });
        assert!(failing.argument_attributes(&json!({})).is_err());
    }

    #[test]
    fn test_snapshot_aggregates_series() {
        let telemetry = InMemoryTelemetry::new();
        let counter =
            telemetry.increment_counter("tools/call calc", InstrumentOptions::new("d", "calls"));
        let histogram = telemetry.histogram("duration", InstrumentOptions::new("d", "ms"));
        let base = Attributes::new().with("mcp.tools.name", "calc");

        counter.add(2);
        histogram.record(2.0, &base);
        histogram.record(4.0, &base.clone().with("error.type", "TypeError"));

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.counters.get("tools/call calc"), Some(&2));
        assert_eq!(snapshot.series.len(), 1);
        let series = snapshot.series.values().next().unwrap();
        assert_eq!(series.count, 2);
        assert_eq!(series.errors, 1);
        assert_eq!(series.avg(), 3.0);
    }

    #[test]
    fn test_reset_detaches_open_spans() {
        let telemetry = InMemoryTelemetry::new();
        let span = telemetry.start_span("s", &Attributes::new());
        telemetry.reset();
        span.end();
        assert!(telemetry.spans().is_empty());
    }

    #[test]
    fn test_stale_span_does_not_touch_spans_started_after_reset() {
        let telemetry = InMemoryTelemetry::new();
        let old = telemetry.start_span("old", &Attributes::new());
        telemetry.reset();

        let fresh = telemetry.start_span("fresh", &Attributes::new());
        old.set_status(SpanStatus::error("stale"));
        old.set_attribute("stale", true.into());
        old.end();

        let spans = telemetry.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "fresh");
        assert!(!spans[0].ended);
        assert_eq!(spans[0].status, SpanStatus::Unset);
        assert!(!spans[0].attributes.contains_key("stale"));

        fresh.set_status(SpanStatus::Ok);
        fresh.end();
        let finished = telemetry.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, SpanStatus::Ok);
    }
}
