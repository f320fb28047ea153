// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for the instrumented handler hot path.
//!
//! Run with: `cargo bench --bench wrapper`

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use mcp_instrumentation::telemetry::{
    Metrics, RuntimeInfo, SequentialIdGenerator, Telemetry, TracingTelemetry,
};
use mcp_instrumentation::{
    handler_fn, HandlerError, HandlerInstrumentation, SharedHandler,
};

fn echo() -> SharedHandler {
    handler_fn(|params: Value| async move { Ok::<_, HandlerError>(params) })
}

fn instrumentation(telemetry: Arc<dyn Telemetry>) -> HandlerInstrumentation {
    HandlerInstrumentation::builder(telemetry)
        .request_ids(SequentialIdGenerator::new("bench"))
        .runtime_info(RuntimeInfo::new("127.0.0.1", Some(3000)))
        .build()
}

/// Bare handler versus the same handler wrapped for each backend.
fn bench_call(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let params = json!({"operation": "add", "a": 2, "b": 3});

    let backends: Vec<(&str, Option<Arc<dyn Telemetry>>)> = vec![
        ("bare", None),
        (
            "tracing",
            Some(Arc::new(TracingTelemetry::with_metrics(Arc::new(Metrics::new())))),
        ),
        (
            "tracing_with_arguments",
            Some(Arc::new(
                TracingTelemetry::with_metrics(Arc::new(Metrics::new()))
                    .with_argument_capture(true, 16),
            )),
        ),
    ];

    let mut group = c.benchmark_group("call");
    group.throughput(Throughput::Elements(1));

    for (name, telemetry) in backends {
        let handler = match telemetry {
            Some(telemetry) => instrumentation(telemetry).wrap(echo(), "tools/call", "echo"),
            None => echo(),
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &params, |b, params| {
            b.iter(|| rt.block_on(async { handler.call(black_box(params.clone())).await }));
        });
    }

    group.finish();
}

/// Cost of wrapping, which acquires both metric handles.
fn bench_wrap(c: &mut Criterion) {
    let instrumentation = instrumentation(Arc::new(TracingTelemetry::with_metrics(Arc::new(
        Metrics::new(),
    ))));

    c.bench_function("wrap", |b| {
        b.iter(|| instrumentation.wrap(echo(), black_box("tools/call"), black_box("echo")));
    });
}

criterion_group!(benches, bench_call, bench_wrap);
criterion_main!(benches);
