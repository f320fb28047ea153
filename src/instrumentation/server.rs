// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Registration interceptor.
//!
//! [`Instrumented`] decorates any server and exposes whichever of the
//! tool/prompt/resource registration traits the server implements. Once
//! instrumented, every handler passed through it is wrapped before the
//! registration reaches the server.

use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, info};

use super::handler::{HandlerInstrumentation, SharedHandler};
use super::McpMethod;
use crate::telemetry::Telemetry;

/// A server that accepts tool registrations.
pub trait ToolRegistration {
    type Config;
    type Output;

    fn register_tool(
        &mut self,
        name: &str,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output;
}

/// A server that accepts prompt registrations.
pub trait PromptRegistration {
    type Config;
    type Output;

    fn register_prompt(
        &mut self,
        name: &str,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output;
}

/// A server that accepts resource registrations.
pub trait ResourceRegistration {
    /// URI or URI template, passed through untouched.
    type Template;
    type Config;
    type Output;

    fn register_resource(
        &mut self,
        name: &str,
        template: Self::Template,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output;
}

/// A server decorated with handler instrumentation.
pub struct Instrumented<S> {
    server: S,
    instrumentation: HandlerInstrumentation,
    instrumented: bool,
}

impl<S> Instrumented<S> {
    /// Decorate `server` without instrumenting yet.
    pub fn new(server: S, telemetry: Arc<dyn Telemetry>) -> Self {
        Self::with_instrumentation(server, HandlerInstrumentation::new(telemetry))
    }

    /// Decorate `server` with a preconfigured [`HandlerInstrumentation`].
    pub fn with_instrumentation(server: S, instrumentation: HandlerInstrumentation) -> Self {
        Self {
            server,
            instrumentation,
            instrumented: false,
        }
    }

    /// Start wrapping handlers registered from now on. Calling this again
    /// has no effect.
    pub fn instrument(&mut self) -> &mut Self {
        if self.instrumented {
            debug!("Server already instrumented, skipping");
            return self;
        }

        self.instrumented = true;
        info!(
            server = std::any::type_name::<S>(),
            "MCP server instrumented"
        );
        self
    }

    pub fn is_instrumented(&self) -> bool {
        self.instrumented
    }

    pub fn inner(&self) -> &S {
        &self.server
    }

    /// Mutable access to the server. Registrations made here bypass
    /// instrumentation.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.server
    }

    pub fn into_inner(self) -> S {
        self.server
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        self.instrumentation.telemetry()
    }

    fn intercept(&self, handler: SharedHandler, method: McpMethod, name: &str) -> SharedHandler {
        if self.instrumented {
            self.instrumentation.wrap(handler, method.as_str(), name)
        } else {
            handler
        }
    }
}

impl<S> Deref for Instrumented<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.server
    }
}

impl<S: ToolRegistration> ToolRegistration for Instrumented<S> {
    type Config = S::Config;
    type Output = S::Output;

    fn register_tool(
        &mut self,
        name: &str,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output {
        let handler = self.intercept(handler, McpMethod::ToolsCall, name);
        self.server.register_tool(name, config, handler)
    }
}

impl<S: PromptRegistration> PromptRegistration for Instrumented<S> {
    type Config = S::Config;
    type Output = S::Output;

    fn register_prompt(
        &mut self,
        name: &str,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output {
        let handler = self.intercept(handler, McpMethod::PromptsCall, name);
        self.server.register_prompt(name, config, handler)
    }
}

impl<S: ResourceRegistration> ResourceRegistration for Instrumented<S> {
    type Template = S::Template;
    type Config = S::Config;
    type Output = S::Output;

    fn register_resource(
        &mut self,
        name: &str,
        template: Self::Template,
        config: Self::Config,
        handler: SharedHandler,
    ) -> Self::Output {
        let handler = self.intercept(handler, McpMethod::ResourcesCall, name);
        self.server.register_resource(name, template, config, handler)
    }
}

/// Decorate `server` and instrument it in one step.
pub fn instrument_server<S>(server: S, telemetry: Arc<dyn Telemetry>) -> Instrumented<S> {
    let mut instrumented = Instrumented::new(server, telemetry);
    instrumented.instrument();
    instrumented
}
