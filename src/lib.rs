// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transparent tracing and metrics for MCP server handlers.
//!
//! Decorate a server with [`Instrumented`] and every tool, prompt and resource
//! handler registered through it reports a span, a duration sample and a call
//! count to a pluggable [`Telemetry`] backend, while returning exactly what the
//! handler returns.
//!
//! # Architecture
//!
//! - [`instrumentation`] - registration interceptor and handler wrapper
//! - [`telemetry`] - telemetry capability, `tracing` and in-memory backends,
//!   metrics registry, logging setup
//! - [`config`] - configuration loading and backend construction
//! - [`error`] - error types
//! - [`demo`] - sample server and handlers for the `mcp-instrument` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_instrumentation::{handler_fn, instrument_server, ToolRegistration, TracingTelemetry};
//!
//! let mut server = instrument_server(MyServer::new(), Arc::new(TracingTelemetry::global()));
//! server.register_tool(
//!     "echo",
//!     json!({"description": "Echo"}),
//!     handler_fn(|params| async move { Ok(params) }),
//! );
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod instrumentation;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{build_telemetry, load_config, ExporterKind, InstrumentationConfig};
pub use error::{ConfigError, HandlerError, Result, TelemetryError};
pub use instrumentation::{
    handler_fn, instrument_server, Handler, HandlerInstrumentation, HandlerResult, Instrumented,
    McpMethod, PromptRegistration, ResourceRegistration, SharedHandler, ToolRegistration,
};
pub use telemetry::{InMemoryTelemetry, Telemetry, TracingTelemetry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let _config = InstrumentationConfig::default();
        let _err = HandlerError::msg("test");
        let _telemetry: std::sync::Arc<dyn Telemetry> =
            std::sync::Arc::new(InMemoryTelemetry::new());
    }
}
