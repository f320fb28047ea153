// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Handler instrumentation for MCP servers.
//!
//! Every tool, prompt and resource handler registered through an
//! [`Instrumented`] server is wrapped in an [`InstrumentedHandler`] that emits,
//! per invocation:
//!
//! - a span named `"<method> <name>"` with status OK or ERROR
//! - a sample on the `mcp.server.operation.duration` histogram (ms)
//! - an increment of the `"<method> <name>"` counter
//!
//! Handler results and failures pass through unchanged. A panicking handler
//! is recorded as an ERROR with `error.type` `"panic"` before the panic
//! resumes. A call future dropped before completion records nothing past the
//! counter increment.
//!
//! # Architecture
//!
//! ```text
//! application ──register_tool()──▶ Instrumented<S> ──register_tool()──▶ S
//!                                       │
//!                                       └─ wrap(handler, "tools/call", name)
//!                                              │
//!                        caller ──call()──▶ InstrumentedHandler ──call()──▶ handler
//!                                              │
//!                                              └─▶ Telemetry (span, histogram, counter)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_instrumentation::instrumentation::{handler_fn, instrument_server, ToolRegistration};
//! use mcp_instrumentation::telemetry::TracingTelemetry;
//!
//! let mut server = instrument_server(MyServer::new(), Arc::new(TracingTelemetry::global()));
//! server.register_tool("echo", json!({}), handler_fn(|params| async move { Ok(params) }));
//! ```

mod handler;
mod server;

use std::fmt;

pub use handler::{
    handler_fn, method_prefix, Handler, HandlerInstrumentation, HandlerInstrumentationBuilder,
    HandlerResult, InstrumentedHandler, SharedHandler, PANIC_ERROR_KIND,
};
pub use server::{
    instrument_server, Instrumented, PromptRegistration, ResourceRegistration, ToolRegistration,
};

/// Histogram shared by every instrumented handler.
pub const OPERATION_DURATION_METRIC: &str = "mcp.server.operation.duration";

pub const OPERATION_DURATION_DESCRIPTION: &str = "MCP request or notification duration as observed on the receiver from the time it was received until the result or ack is sent.";

pub const OPERATION_COUNT_DESCRIPTION: &str =
    "MCP request or notification count as observed on the receiver.";

pub const METHOD_NAME_ATTRIBUTE: &str = "mcp.method.name";
pub const REQUEST_ID_ATTRIBUTE: &str = "mcp.request.id";
pub const CLIENT_ADDRESS_ATTRIBUTE: &str = "client.address";
pub const CLIENT_PORT_ATTRIBUTE: &str = "client.port";

/// MCP methods whose handlers are instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McpMethod {
    ToolsCall,
    PromptsCall,
    ResourcesCall,
}

impl McpMethod {
    pub const ALL: [McpMethod; 3] = [Self::ToolsCall, Self::PromptsCall, Self::ResourcesCall];

    /// Wire method name, e.g. `"tools/call"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolsCall => "tools/call",
            Self::PromptsCall => "prompts/call",
            Self::ResourcesCall => "resources/call",
        }
    }

    /// Method category, e.g. `"tools"`.
    pub fn prefix(&self) -> &'static str {
        method_prefix(self.as_str())
    }

    /// Attribute key carrying the handler name, e.g. `"mcp.tools.name"`.
    pub fn name_attribute(&self) -> String {
        format!("mcp.{}.name", self.prefix())
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
