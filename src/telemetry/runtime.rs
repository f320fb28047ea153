// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-level network facts recorded on every span.

use std::env;

/// Address used when the environment names none.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Environment variables consulted for the address, in order.
pub const ADDRESS_ENV_VARS: &[&str] = &["MCP_SERVER_ADDRESS", "HOST"];

/// Environment variables consulted for the port, in order.
pub const PORT_ENV_VARS: &[&str] = &["MCP_SERVER_PORT", "PORT"];

/// Network origin of the running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub address: String,
    pub port: Option<u16>,
}

impl RuntimeInfo {
    pub fn new(address: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl Default for RuntimeInfo {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, None)
    }
}

/// Source of the current network origin.
pub trait RuntimeInfoSource: Send + Sync {
    fn runtime_info(&self) -> RuntimeInfo;
}

/// A fixed value is its own source.
impl RuntimeInfoSource for RuntimeInfo {
    fn runtime_info(&self) -> RuntimeInfo {
        self.clone()
    }
}

/// Runtime info read from the process environment once, at construction.
#[derive(Debug, Clone)]
pub struct ProcessRuntimeInfo {
    info: RuntimeInfo,
}

impl ProcessRuntimeInfo {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = ADDRESS_ENV_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        // An unparseable port is treated as unknown.
        let port = PORT_ENV_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .find_map(|value| value.trim().parse::<u16>().ok());

        Self {
            info: RuntimeInfo { address, port },
        }
    }
}

impl Default for ProcessRuntimeInfo {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeInfoSource for ProcessRuntimeInfo {
    fn runtime_info(&self) -> RuntimeInfo {
        self.info.clone()
    }
}
