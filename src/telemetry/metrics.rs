// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process metrics registry.
//!
//! Backs [`TracingTelemetry`](super::TracingTelemetry): counters are lock-free
//! atomics, histogram series are keyed by metric name plus their attributes
//! (minus `error.type`, which is tallied per series instead).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::Serialize;

use super::{Attributes, CounterRecorder, HistogramRecorder, InstrumentOptions};

/// Attribute recorded on failed operations.
pub const ERROR_TYPE_ATTRIBUTE: &str = "error.type";

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| Arc::new(Metrics::new()));

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Counter cells by metric name.
    counters: RwLock<HashMap<String, CounterCell>>,

    /// Histogram series by series key.
    histograms: RwLock<HashMap<String, SeriesMetrics>>,

    /// Start time for calculating uptime.
    start_time: Instant,
}

#[derive(Debug, Clone)]
struct CounterCell {
    value: Arc<AtomicU64>,
    options: InstrumentOptions,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Get or create the counter cell for `name`.
    ///
    /// The first registration's options win.
    pub fn counter(&self, name: &str, options: InstrumentOptions) -> MetricsCounter {
        if let Some(cell) = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return MetricsCounter {
                value: Arc::clone(&cell.value),
            };
        }

        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        let cell = counters.entry(name.to_string()).or_insert_with(|| CounterCell {
            value: Arc::new(AtomicU64::new(0)),
            options,
        });
        MetricsCounter {
            value: Arc::clone(&cell.value),
        }
    }

    /// Handle that records into the histogram series named `name`.
    pub fn histogram(self: &Arc<Self>, name: &str) -> MetricsHistogram {
        MetricsHistogram {
            name: name.to_string(),
            metrics: Arc::clone(self),
        }
    }

    /// Record a histogram sample.
    pub fn record_histogram(&self, name: &str, value: f64, attributes: &Attributes) {
        let error_type = attributes
            .get(ERROR_TYPE_ATTRIBUTE)
            .map(|value| value.to_string());
        let key = series_key(name, attributes);

        let mut histograms = self
            .histograms
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        histograms
            .entry(key)
            .or_insert_with(|| SeriesMetrics::new(name))
            .record(value, error_type);
    }

    /// Current value of a counter.
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|cell| cell.value.load(Ordering::Relaxed))
    }

    /// Unit a counter was registered with.
    pub fn counter_unit(&self, name: &str) -> Option<String> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|cell| cell.options.unit.clone())
    }

    /// Get a histogram series by its key.
    pub fn series(&self, key: &str) -> Option<SeriesMetrics> {
        self.histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| (name.clone(), cell.value.load(Ordering::Relaxed)))
            .collect();
        let series = self
            .histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, metrics)| (key.clone(), metrics.clone()))
            .collect();

        MetricsSnapshot {
            counters,
            series,
            uptime_ms: self.uptime().as_secs_f64() * 1000.0,
        }
    }

    /// Reset all metrics. Counters are zeroed in place, so handles already
    /// handed out keep reporting into the registry.
    pub fn reset(&self) {
        for cell in self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            cell.value.store(0, Ordering::Relaxed);
        }
        self.histograms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Series key: metric name followed by the attributes that identify the series.
pub fn series_key(name: &str, attributes: &Attributes) -> String {
    let identifying: Attributes = attributes
        .iter()
        .filter(|(key, _)| *key != ERROR_TYPE_ATTRIBUTE)
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    format!("{name}{identifying}")
}

/// Counter handle bound to one registry cell.
#[derive(Debug, Clone)]
pub struct MetricsCounter {
    value: Arc<AtomicU64>,
}

impl MetricsCounter {
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl CounterRecorder for MetricsCounter {
    fn add(&self, amount: u64) {
        self.value.fetch_add(amount, Ordering::Relaxed);
    }
}

/// Histogram handle bound to one metric name.
#[derive(Debug, Clone)]
pub struct MetricsHistogram {
    name: String,
    metrics: Arc<Metrics>,
}

impl HistogramRecorder for MetricsHistogram {
    fn record(&self, value: f64, attributes: &Attributes) {
        self.metrics.record_histogram(&self.name, value, attributes);
    }
}

/// Aggregates for one histogram series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesMetrics {
    /// Metric name of the series.
    pub name: String,

    /// Number of samples.
    pub count: u64,

    /// Samples recorded with an `error.type` attribute.
    pub errors: u64,

    /// Sample count per `error.type` value.
    pub error_types: BTreeMap<String, u64>,

    /// Sum of all samples (ms).
    pub total: f64,

    /// Minimum sample (ms).
    pub min: f64,

    /// Maximum sample (ms).
    pub max: f64,

    /// Bucketed distribution.
    pub histogram: Histogram,
}

impl SeriesMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            errors: 0,
            error_types: BTreeMap::new(),
            total: 0.0,
            min: f64::MAX,
            max: 0.0,
            histogram: Histogram::default(),
        }
    }

    /// Record one sample.
    pub fn record(&mut self, value: f64, error_type: Option<String>) {
        self.count += 1;
        if let Some(error_type) = error_type {
            self.errors += 1;
            *self.error_types.entry(error_type).or_insert(0) += 1;
        }
        self.total += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.histogram.record(value);
    }

    /// Average sample value.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    /// Fraction of samples without an error (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            1.0
        } else {
            (self.count - self.errors) as f64 / self.count as f64
        }
    }
}

/// Simple histogram with fixed buckets.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    /// Upper bucket boundaries in milliseconds.
    /// Default: [0.1ms, 1ms, 10ms, 100ms, 1s, 10s, +inf]
    buckets: Vec<f64>,

    /// Count per bucket.
    counts: Vec<u64>,
}

impl Histogram {
    /// Create a histogram with custom bucket boundaries (in milliseconds).
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    /// Record a value.
    pub fn record(&mut self, value: f64) {
        let bucket_idx = self
            .buckets
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.buckets.len());
        self.counts[bucket_idx] += 1;
    }

    /// Get counts for each bucket.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Get bucket boundaries.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// Approximate percentile (p50, p90, p99, etc.) as a bucket boundary.
    pub fn percentile(&self, p: f64) -> f64 {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;

        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                // Overflow bucket reports ten times the last boundary
                return if i < self.buckets.len() {
                    self.buckets[i]
                } else {
                    self.buckets.last().copied().unwrap_or(0.0) * 10.0
                };
            }
        }

        0.0
    }

    pub fn p50(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn p90(&self) -> f64 {
        self.percentile(90.0)
    }

    pub fn p99(&self) -> f64 {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_buckets(vec![0.1, 1.0, 10.0, 100.0, 1_000.0, 10_000.0])
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Counter values by name.
    pub counters: BTreeMap<String, u64>,

    /// Histogram series by series key.
    pub series: BTreeMap<String, SeriesMetrics>,

    /// Uptime when snapshot was taken.
    pub uptime_ms: f64,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metrics Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2}ms\n\n", self.uptime_ms));

        if !self.counters.is_empty() {
            report.push_str("Counters:\n");
            for (name, value) in &self.counters {
                report.push_str(&format!("  {name}: {value}\n"));
            }
            report.push('\n');
        }

        if !self.series.is_empty() {
            report.push_str("Histograms:\n");
            for (key, series) in &self.series {
                report.push_str(&format!(
                    "  {}: {} samples, {:.1}% success, avg {:.2}ms, p99 {:.2}ms\n",
                    key,
                    series.count,
                    series.success_rate() * 100.0,
                    series.avg(),
                    series.histogram.p99()
                ));
            }
        }

        report
    }
}
