// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A small in-memory MCP server and sample handlers used by the
//! `mcp-instrument` binary.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::instrumentation::{
    handler_fn, HandlerResult, McpMethod, PromptRegistration, ResourceRegistration,
    SharedHandler, ToolRegistration,
};

/// A registered handler and the config it was registered with.
#[derive(Clone)]
pub struct Registration {
    pub config: Value,
    pub template: Option<String>,
    pub handler: SharedHandler,
}

/// Server that keeps registered handlers in maps keyed by name.
#[derive(Clone, Default)]
pub struct DemoServer {
    tools: BTreeMap<String, Registration>,
    prompts: BTreeMap<String, Registration>,
    resources: BTreeMap<String, Registration>,
}

impl DemoServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self, method: McpMethod) -> &BTreeMap<String, Registration> {
        match method {
            McpMethod::ToolsCall => &self.tools,
            McpMethod::PromptsCall => &self.prompts,
            McpMethod::ResourcesCall => &self.resources,
        }
    }

    pub fn registration(&self, method: McpMethod, name: &str) -> Option<&Registration> {
        self.registry(method).get(name)
    }

    pub fn handler(&self, method: McpMethod, name: &str) -> Option<SharedHandler> {
        self.registration(method, name).map(|r| r.handler.clone())
    }

    /// Registered names for `method`, sorted.
    pub fn names(&self, method: McpMethod) -> Vec<&str> {
        self.registry(method).keys().map(String::as_str).collect()
    }

    /// Dispatch a call the way an MCP transport would.
    pub async fn call(&self, method: McpMethod, name: &str, params: Value) -> HandlerResult {
        let handler = self.handler(method, name).ok_or_else(|| {
            HandlerError::new("NotFound", format!("Unknown {method} handler: {name}"))
        })?;
        handler.call(params).await
    }
}

impl ToolRegistration for DemoServer {
    type Config = Value;
    type Output = ();

    fn register_tool(&mut self, name: &str, config: Value, handler: SharedHandler) {
        self.tools.insert(
            name.to_string(),
            Registration {
                config,
                template: None,
                handler,
            },
        );
    }
}

impl PromptRegistration for DemoServer {
    type Config = Value;
    type Output = ();

    fn register_prompt(&mut self, name: &str, config: Value, handler: SharedHandler) {
        self.prompts.insert(
            name.to_string(),
            Registration {
                config,
                template: None,
                handler,
            },
        );
    }
}

impl ResourceRegistration for DemoServer {
    type Template = String;
    type Config = Value;
    type Output = ();

    fn register_resource(
        &mut self,
        name: &str,
        template: String,
        config: Value,
        handler: SharedHandler,
    ) {
        self.resources.insert(
            name.to_string(),
            Registration {
                config,
                template: Some(template),
                handler,
            },
        );
    }
}

/// Arithmetic on `a` and `b`.
pub fn calculator() -> SharedHandler {
    handler_fn(|params: Value| async move {
        let operand = |key: &str| {
            params[key]
                .as_f64()
                .ok_or_else(|| HandlerError::new("TypeError", format!("'{key}' must be a number")))
        };
        let (a, b) = (operand("a")?, operand("b")?);

        let result = match params["operation"].as_str() {
            Some("add") => a + b,
            Some("subtract") => a - b,
            Some("multiply") => a * b,
            Some("divide") if b == 0.0 => {
                return Err(HandlerError::new("RangeError", "Division by zero"))
            }
            Some("divide") => a / b,
            Some(other) => return Err(HandlerError::msg(format!("Unknown operation: {other}"))),
            None => return Err(HandlerError::new("TypeError", "'operation' is required")),
        };

        Ok::<_, HandlerError>(json!({ "result": number(result) }))
    })
}

// Integral results stay integers on the wire
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Serves `test.txt`; every other path is missing.
pub fn file_reader() -> SharedHandler {
    handler_fn(|params: Value| async move {
        match params["path"].as_str() {
            Some("test.txt") => Ok(json!({ "content": "This is test content" })),
            _ => Err(HandlerError::msg("Resource not found")),
        }
    })
}

/// Greets `name`, or asks after an anonymous caller.
pub fn greeting() -> SharedHandler {
    handler_fn(|params: Value| async move {
        let text = match params["name"].as_str() {
            Some(name) => format!("Hello {name}!"),
            None => "Hello! How are you today?".to_string(),
        };
        Ok::<_, HandlerError>(json!({
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text }
            }]
        }))
    })
}

/// Register the sample calculator tool, greeting prompt and file-reader resource.
pub fn register_demo_handlers<S>(server: &mut S)
where
    S: ToolRegistration<Config = Value>
        + PromptRegistration<Config = Value>
        + ResourceRegistration<Template = String, Config = Value>,
{
    server.register_tool(
        "calculator",
        json!({ "description": "Performs basic arithmetic" }),
        calculator(),
    );
    server.register_prompt(
        "greeting",
        json!({ "description": "Greets someone by name" }),
        greeting(),
    );
    server.register_resource(
        "file-reader",
        "file://{path}".to_string(),
        json!({ "description": "Reads a file" }),
        file_reader(),
    );
}

/// The calls the binary issues per round: method, name, params.
pub fn demo_calls() -> Vec<(McpMethod, &'static str, Value)> {
    vec![
        (
            McpMethod::ToolsCall,
            "calculator",
            json!({ "operation": "add", "a": 2, "b": 3 }),
        ),
        (
            McpMethod::ToolsCall,
            "calculator",
            json!({ "operation": "divide", "a": 1, "b": 0 }),
        ),
        (McpMethod::PromptsCall, "greeting", json!({ "name": "World" })),
        (McpMethod::ResourcesCall, "file-reader", json!({ "path": "test.txt" })),
        (McpMethod::ResourcesCall, "file-reader", json!({ "path": "error.txt" })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::instrument_server;
    use crate::telemetry::{InMemoryTelemetry, SpanStatus};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_calculator() {
        let calc = calculator();
        let result = calc
            .call(json!({"operation": "add", "a": 2, "b": 3}))
            .await
            .unwrap();
        assert_eq!(result, json!({"result": 5}));

        let result = calc
            .call(json!({"operation": "divide", "a": 1, "b": 4}))
            .await
            .unwrap();
        assert_eq!(result, json!({"result": 0.25}));

        let err = calc
            .call(json!({"operation": "divide", "a": 1, "b": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "RangeError");

        let err = calc
            .call(json!({"operation": "pow", "a": 1, "b": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Unknown operation: pow");
    }

    #[tokio::test]
    async fn test_file_reader_and_greeting() {
        let content = file_reader().call(json!({"path": "test.txt"})).await.unwrap();
        assert_eq!(content["content"], "This is test content");

        let err = file_reader()
            .call(json!({"path": "error.txt"}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Resource not found");

        let named = greeting().call(json!({"name": "World"})).await.unwrap();
        assert_eq!(named["messages"][0]["content"]["text"], "Hello World!");

        let anonymous = greeting().call(json!({})).await.unwrap();
        assert_eq!(
            anonymous["messages"][0]["content"]["text"],
            "Hello! How are you today?"
        );
    }

    #[tokio::test]
    async fn test_demo_server_dispatch() {
        let telemetry = InMemoryTelemetry::new();
        let mut server = instrument_server(DemoServer::new(), Arc::new(telemetry.clone()));
        register_demo_handlers(&mut server);

        assert_eq!(server.names(McpMethod::ToolsCall), vec!["calculator"]);
        assert_eq!(
            server
                .registration(McpMethod::ResourcesCall, "file-reader")
                .and_then(|r| r.template.as_deref()),
            Some("file://{path}")
        );

        for (method, name, params) in demo_calls() {
            let _ = server.call(method, name, params).await;
        }

        assert_eq!(telemetry.finished_spans().len(), 5);
        assert_eq!(telemetry.counter_value("tools/call calculator"), 2);
        assert_eq!(telemetry.counter_value("resources/call file-reader"), 2);
        let errors = telemetry
            .finished_spans()
            .iter()
            .filter(|s| matches!(s.status, SpanStatus::Error { .. }))
            .count();
        assert_eq!(errors, 2);

        let err = server
            .call(McpMethod::ToolsCall, "missing", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
        assert_eq!(err.message(), "Unknown tools/call handler: missing");
    }
}
