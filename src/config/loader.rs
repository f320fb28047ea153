// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files and the environment.

use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;

use super::types::{ExporterKind, InstrumentationConfig};

pub const SERVICE_NAME_ENV: &str = "MCP_SERVICE_NAME";
pub const SERVICE_VERSION_ENV: &str = "MCP_SERVICE_VERSION";
pub const EXPORTER_ENV: &str = "MCP_EXPORTER";
pub const CAPTURE_ARGUMENTS_ENV: &str = "MCP_CAPTURE_ARGUMENTS";

/// Load a configuration file, JSON (`.json`) or YAML (`.yaml`/`.yml`).
pub fn load_config_file(path: &Path) -> Result<InstrumentationConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        "json" => serde_json::from_str(&content).map_err(ConfigError::from),
        other => Err(ConfigError::InvalidFormat(format!(
            "unsupported config file extension '{other}' in {}",
            path.display()
        ))),
    }
}

/// Apply `MCP_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut InstrumentationConfig) -> Result<(), ConfigError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply `MCP_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut InstrumentationConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup(SERVICE_NAME_ENV) {
        config.service_name = name;
    }
    if let Some(version) = lookup(SERVICE_VERSION_ENV) {
        config.service_version = version;
    }
    if let Some(exporter) = lookup(EXPORTER_ENV) {
        config.exporter = exporter.parse::<ExporterKind>()?;
    }
    if let Some(capture) = lookup(CAPTURE_ARGUMENTS_ENV) {
        config.capture_arguments = parse_bool(CAPTURE_ARGUMENTS_ENV, &capture)?;
    }
    Ok(())
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid_value(
            field,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Load configuration: the file at `path` if given (defaults otherwise),
/// then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<InstrumentationConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading instrumentation config");
            load_config_file(path)?
        }
        None => InstrumentationConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{"serviceName": "calc", "captureArguments": true, "maxArgumentAttributes": 4}"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.service_name, "calc");
        assert!(config.capture_arguments);
        assert_eq!(config.max_argument_attributes, 4);
    }

    #[test]
    fn test_load_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mcp.yaml");
        std::fs::write(
            &path,
            "serviceName: calc\nexporter: memory\nlogging:\n  level: debug\n  ansi: false\n",
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.exporter, ExporterKind::Memory);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = load_config_file(&temp.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_unknown_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mcp.toml");
        std::fs::write(&path, "serviceName = \"calc\"\n").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
        assert!(err.to_string().contains("toml"));
    }

    #[test]
    fn test_overrides() {
        let mut config = InstrumentationConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("MCP_SERVICE_NAME", "from-env"),
                ("MCP_SERVICE_VERSION", "9.9.9"),
                ("MCP_EXPORTER", "memory"),
                ("MCP_CAPTURE_ARGUMENTS", "yes"),
            ]),
        )
        .unwrap();

        assert_eq!(config.service_name, "from-env");
        assert_eq!(config.service_version, "9.9.9");
        assert_eq!(config.exporter, ExporterKind::Memory);
        assert!(config.capture_arguments);
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = InstrumentationConfig::default();
        let err = apply_overrides(&mut config, env(&[("MCP_CAPTURE_ARGUMENTS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("MCP_CAPTURE_ARGUMENTS"));

        let err = apply_overrides(&mut config, env(&[("MCP_EXPORTER", "jaeger")])).unwrap_err();
        assert!(err.to_string().contains("exporter"));
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut config = InstrumentationConfig {
            service_name: "file".to_string(),
            ..Default::default()
        };
        apply_overrides(&mut config, env(&[])).unwrap();
        assert_eq!(config.service_name, "file");
    }
}
