// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Handler trait and the instrumenting wrapper.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    CLIENT_ADDRESS_ATTRIBUTE, CLIENT_PORT_ATTRIBUTE, METHOD_NAME_ATTRIBUTE,
    OPERATION_COUNT_DESCRIPTION, OPERATION_DURATION_DESCRIPTION, OPERATION_DURATION_METRIC,
    REQUEST_ID_ATTRIBUTE,
};
use crate::error::HandlerError;
use crate::telemetry::{
    Attributes, CounterRecorder, HistogramRecorder, InstrumentOptions, ProcessRuntimeInfo,
    RequestIdGenerator, RuntimeInfoSource, SpanStatus, Telemetry, UuidGenerator,
    ERROR_TYPE_ATTRIBUTE,
};

/// Outcome of a handler invocation.
pub type HandlerResult = Result<Value, HandlerError>;

/// A handler shared between the registering code and the server.
pub type SharedHandler = Arc<dyn Handler>;

/// An application-supplied tool, prompt or resource handler.
///
/// Any `Fn(Value) -> impl Future<Output = HandlerResult>` closure is a handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Value) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, params: Value) -> HandlerResult {
        (self)(params).await
    }
}

/// Turn an async closure into a [`SharedHandler`].
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// Category of an MCP method: the part before the first `/`.
pub fn method_prefix(method: &str) -> &str {
    method.split_once('/').map_or(method, |(prefix, _)| prefix)
}

/// Produces instrumented handlers that share one telemetry backend.
#[derive(Clone)]
pub struct HandlerInstrumentation {
    telemetry: Arc<dyn Telemetry>,
    request_ids: Arc<dyn RequestIdGenerator>,
    runtime: Arc<dyn RuntimeInfoSource>,
}

impl HandlerInstrumentation {
    /// Create with UUID request ids and runtime info from the environment.
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self::builder(telemetry).build()
    }

    pub fn builder(telemetry: Arc<dyn Telemetry>) -> HandlerInstrumentationBuilder {
        HandlerInstrumentationBuilder {
            telemetry,
            request_ids: None,
            runtime: None,
        }
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.telemetry
    }

    /// Wrap `handler` so every call is traced and measured under
    /// `category` (e.g. `"tools/call"`) and `name`.
    pub fn wrap(&self, handler: SharedHandler, category: &str, name: &str) -> SharedHandler {
        Arc::new(InstrumentedHandler::new(self, handler, category, name))
    }
}

impl fmt::Debug for HandlerInstrumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstrumentation").finish_non_exhaustive()
    }
}

/// Builder for [`HandlerInstrumentation`].
pub struct HandlerInstrumentationBuilder {
    telemetry: Arc<dyn Telemetry>,
    request_ids: Option<Arc<dyn RequestIdGenerator>>,
    runtime: Option<Arc<dyn RuntimeInfoSource>>,
}

impl HandlerInstrumentationBuilder {
    /// Use a custom request id generator.
    pub fn request_ids(mut self, generator: impl RequestIdGenerator + 'static) -> Self {
        self.request_ids = Some(Arc::new(generator));
        self
    }

    /// Use a custom runtime info source.
    pub fn runtime_info(mut self, source: impl RuntimeInfoSource + 'static) -> Self {
        self.runtime = Some(Arc::new(source));
        self
    }

    pub fn build(self) -> HandlerInstrumentation {
        HandlerInstrumentation {
            telemetry: self.telemetry,
            request_ids: self.request_ids.unwrap_or_else(|| Arc::new(UuidGenerator)),
            runtime: self
                .runtime
                .unwrap_or_else(|| Arc::new(ProcessRuntimeInfo::from_env())),
        }
    }
}

/// A handler that records a span, a duration sample and a counter increment
/// around every call to the handler it wraps.
///
/// Metric handles are acquired once, when the wrapper is built, and shared by
/// all concurrent invocations.
pub struct InstrumentedHandler {
    inner: SharedHandler,
    method: String,
    name: String,
    span_name: String,
    base_attributes: Attributes,
    histogram: Arc<dyn HistogramRecorder>,
    counter: Arc<dyn CounterRecorder>,
    telemetry: Arc<dyn Telemetry>,
    request_ids: Arc<dyn RequestIdGenerator>,
    runtime: Arc<dyn RuntimeInfoSource>,
}

impl InstrumentedHandler {
    pub fn new(
        instrumentation: &HandlerInstrumentation,
        inner: SharedHandler,
        method: &str,
        name: &str,
    ) -> Self {
        let telemetry = Arc::clone(&instrumentation.telemetry);
        let span_name = format!("{method} {name}");

        let base_attributes = Attributes::new()
            .with(METHOD_NAME_ATTRIBUTE, method)
            .with(format!("mcp.{}.name", method_prefix(method)), name);

        let histogram = telemetry.histogram(
            OPERATION_DURATION_METRIC,
            InstrumentOptions::new(OPERATION_DURATION_DESCRIPTION, "ms"),
        );
        let counter = telemetry.increment_counter(
            &span_name,
            InstrumentOptions::new(OPERATION_COUNT_DESCRIPTION, "calls"),
        );

        debug!(method = %method, name = %name, "Handler instrumented");

        Self {
            inner,
            method: method.to_string(),
            name: name.to_string(),
            span_name,
            base_attributes,
            histogram,
            counter,
            telemetry,
            request_ids: Arc::clone(&instrumentation.request_ids),
            runtime: Arc::clone(&instrumentation.runtime),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Span and counter name, `"<method> <name>"`.
    pub fn span_name(&self) -> &str {
        &self.span_name
    }

    /// Attributes fixed at wrap time.
    pub fn base_attributes(&self) -> &Attributes {
        &self.base_attributes
    }

    fn call_attributes(&self, params: &Value) -> Attributes {
        let mut attributes = self.base_attributes.clone();
        attributes.insert(REQUEST_ID_ATTRIBUTE, self.request_ids.next_id());

        let runtime = self.runtime.runtime_info();
        attributes.insert(CLIENT_ADDRESS_ATTRIBUTE, runtime.address);
        if let Some(port) = runtime.port {
            attributes.insert(CLIENT_PORT_ATTRIBUTE, port);
        }

        // A telemetry failure never blocks the handler
        match self.telemetry.argument_attributes(params) {
            Ok(extra) => attributes.extend(extra),
            Err(err) => warn!(
                method = %self.method,
                name = %self.name,
                error = %err,
                "Skipping argument attributes"
            ),
        }

        attributes
    }
}

impl fmt::Debug for InstrumentedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedHandler")
            .field("method", &self.method)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for InstrumentedHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        let attributes = self.call_attributes(&params);
        let span = self.telemetry.start_span(&self.span_name, &attributes);
        self.counter.add(1);

        // Taken after span start and counter increment; their overhead is not measured
        let start = Instant::now();

        let caught = CatchUnwind(span.attach(self.inner.call(params))).await;

        let mut histogram_attributes = self.base_attributes.clone();
        let error = match &caught {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some((err.kind().to_string(), err.message().to_string())),
            Err(payload) => Some((PANIC_ERROR_KIND.to_string(), panic_message(&**payload))),
        };
        match error {
            None => span.set_status(SpanStatus::Ok),
            Some((kind, message)) => {
                span.set_status(SpanStatus::error(message));
                span.set_attribute(ERROR_TYPE_ATTRIBUTE, kind.as_str().into());
                histogram_attributes.insert(ERROR_TYPE_ATTRIBUTE, kind);
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.histogram.record(duration_ms, &histogram_attributes);
        span.end();

        match caught {
            Ok(outcome) => outcome,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

/// `error.type` recorded when a handler panics.
pub const PANIC_ERROR_KIND: &str = "panic";

/// Polls a future, turning a panic during any poll into an `Err` payload.
struct CatchUnwind<F>(F);

impl<F: Future + Unpin> Future for CatchUnwind<F> {
    type Output = std::thread::Result<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = &mut self.0;
        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
