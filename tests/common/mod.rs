// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use serde_json::{json, Value};

use mcp_instrumentation::{
    handler_fn, HandlerError, PromptRegistration, ResourceRegistration, SharedHandler,
    ToolRegistration,
};

/// Records every registration it receives.
#[derive(Default)]
pub struct MockMcpServer {
    pub tools: HashMap<String, (Value, SharedHandler)>,
    pub prompts: HashMap<String, (Value, SharedHandler)>,
    pub resources: HashMap<String, (String, Value, SharedHandler)>,
    pub registrations: Vec<String>,
}

impl MockMcpServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool_handler(&self, name: &str) -> SharedHandler {
        self.tools[name].1.clone()
    }

    pub fn prompt_handler(&self, name: &str) -> SharedHandler {
        self.prompts[name].1.clone()
    }

    pub fn resource_handler(&self, name: &str) -> SharedHandler {
        self.resources[name].2.clone()
    }
}

impl ToolRegistration for MockMcpServer {
    type Config = Value;
    type Output = ();

    fn register_tool(&mut self, name: &str, config: Value, handler: SharedHandler) {
        self.registrations.push(format!("tool:{name}"));
        self.tools.insert(name.to_string(), (config, handler));
    }
}

impl PromptRegistration for MockMcpServer {
    type Config = Value;
    type Output = ();

    fn register_prompt(&mut self, name: &str, config: Value, handler: SharedHandler) {
        self.registrations.push(format!("prompt:{name}"));
        self.prompts.insert(name.to_string(), (config, handler));
    }
}

impl ResourceRegistration for MockMcpServer {
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
        self.registrations.push(format!("resource:{name}"));
        self.resources
            .insert(name.to_string(), (template, config, handler));
    }
}

/// A server exposing no registration kinds at all.
#[derive(Debug, Default, PartialEq)]
pub struct EmptyServer {
    pub touched: bool,
}

pub fn calculator_tool() -> SharedHandler {
    handler_fn(|params: Value| async move {
        match params["operation"].as_str() {
            Some("add") => {
                let a = params["a"].as_i64().unwrap_or_default();
                let b = params["b"].as_i64().unwrap_or_default();
                Ok(json!({ "result": a + b }))
            }
            _ => Err(HandlerError::msg("Unsupported operation")),
        }
    })
}

pub fn failing_tool() -> SharedHandler {
    handler_fn(|_params: Value| async move {
        Err::<Value, _>(HandlerError::msg("Tool failed"))
    })
}

pub fn greeting_prompt() -> SharedHandler {
    handler_fn(|params: Value| async move {
        let name = params["name"].as_str().unwrap_or("stranger").to_string();
        Ok::<_, HandlerError>(json!({
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": format!("Hello {name}!") }
            }]
        }))
    })
}

pub fn failing_prompt() -> SharedHandler {
    handler_fn(|_params: Value| async move {
        Err::<Value, _>(HandlerError::new("TypeError", "Prompt failed"))
    })
}

pub fn file_reader_resource() -> SharedHandler {
    handler_fn(|params: Value| async move {
        match params["path"].as_str() {
            Some("test.txt") => Ok(json!({ "content": "This is test content" })),
            _ => Err(HandlerError::msg("Resource not found")),
        }
    })
}
