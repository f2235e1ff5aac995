// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, HypergraphConfig, ProcessingMode};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "hypergraph.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `HYPERGRAPH_CONFIG_PATH` environment variable
/// 2. Current working directory: `./hypergraph.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("HYPERGRAPH_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by HYPERGRAPH_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet HYPERGRAPH_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<HypergraphConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file).map_err(|source| ConfigError::IoError {
        path: config_file.clone(),
        source,
    })?;
    let mut config: HypergraphConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: config_file.clone(),
            message: e.to_string(),
        })?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_value<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}

/// Apply one named override
///
/// Keys: `seed`, `log_level`, `log_format`, `debug`, `processing_mode`,
/// `hebbian_rate`, `stdp_rate`, `p_gate`. Unknown keys and unparseable
/// values are `ConfigError::InvalidValue` and leave `config` untouched.
pub fn set_override(config: &mut HypergraphConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "seed" => config.brain.seed = parse_value(key, value)?,
        "log_level" => config.system.log_level = value.to_string(),
        "log_format" => config.logging.format = value.to_string(),
        "debug" => config.system.debug = parse_bool(key, value)?,
        "processing_mode" => config.brain.processing_mode = parse_value::<ProcessingMode>(key, value)?,
        "hebbian_rate" => config.learning.hebbian_rate = parse_value(key, value)?,
        "stdp_rate" => config.learning.stdp_rate = parse_value(key, value)?,
        "p_gate" => config.learning.p_gate = parse_value(key, value)?,
        _ => {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "unknown override".to_string(),
            })
        }
    }
    Ok(())
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HYPERGRAPH_SEED` -> `brain.seed`
/// - `HYPERGRAPH_LOG_LEVEL` -> `system.log_level`
/// - `HYPERGRAPH_PROCESSING_MODE` -> `brain.processing_mode`
/// - `HYPERGRAPH_HEBBIAN_RATE` -> `learning.hebbian_rate`
/// - `HYPERGRAPH_STDP_RATE` -> `learning.stdp_rate`
/// - `HYPERGRAPH_P_GATE` -> `learning.p_gate`
pub fn apply_environment_overrides(config: &mut HypergraphConfig) {
    const VARS: [(&str, &str); 6] = [
        ("HYPERGRAPH_SEED", "seed"),
        ("HYPERGRAPH_LOG_LEVEL", "log_level"),
        ("HYPERGRAPH_PROCESSING_MODE", "processing_mode"),
        ("HYPERGRAPH_HEBBIAN_RATE", "hebbian_rate"),
        ("HYPERGRAPH_STDP_RATE", "stdp_rate"),
        ("HYPERGRAPH_P_GATE", "p_gate"),
    ];
    for (var, key) in VARS {
        if let Ok(value) = env::var(var) {
            // Runtime overrides are best effort
            let _ = set_override(config, key, &value);
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// Unknown keys and unparseable values are skipped; use [`set_override`]
/// to see them.
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"seed": "7", "processing_mode": "parallel"}`)
pub fn apply_cli_overrides(config: &mut HypergraphConfig, cli_args: &HashMap<String, String>) {
    for (key, value) in cli_args {
        let _ = set_override(config, key, value);
    }
}
