// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ArmbandConfig, ConfigError, ConfigResult, LogFileConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the armband configuration file
///
/// Search order:
/// 1. `ARMBAND_CONFIG_PATH` environment variable
/// 2. Current working directory: `./armband.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("ARMBAND_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by ARMBAND_CONFIG_PATH not found: {}",
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

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet ARMBAND_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
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
) -> ConfigResult<ArmbandConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ArmbandConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ARMBAND_PROFILE_DIR` -> `profiles.storage_dir`
/// - `ARMBAND_LOAD_PROFILE_ON_CONNECT` -> `profiles.load_on_connect`
/// - `ARMBAND_MAX_EVENTS_PER_DRAIN` -> `dispatch.max_events_per_drain`
/// - `ARMBAND_LOG_LEVEL` -> `logging.level`
/// - `ARMBAND_LOG_DIR` -> `logging.file.dir` (enables file logging)
pub fn apply_environment_overrides(config: &mut ArmbandConfig) {
    if let Ok(value) = env::var("ARMBAND_PROFILE_DIR") {
        config.profiles.storage_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("ARMBAND_LOAD_PROFILE_ON_CONNECT") {
        config.profiles.load_on_connect = parse_flag(&value);
    }
    if let Ok(value) = env::var("ARMBAND_MAX_EVENTS_PER_DRAIN") {
        if let Ok(max) = value.parse::<usize>() {
            config.dispatch.max_events_per_drain = max;
        }
    }
    if let Ok(value) = env::var("ARMBAND_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("ARMBAND_LOG_DIR") {
        set_log_dir(config, value);
    }
}

fn set_log_dir(config: &mut ArmbandConfig, dir: impl Into<PathBuf>) {
    config.logging.file.get_or_insert_with(LogFileConfig::default).dir = dir.into();
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"profile_dir": "/tmp/p", "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut ArmbandConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("profile_dir") {
        config.profiles.storage_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("load_on_connect") {
        config.profiles.load_on_connect = parse_flag(value);
    }
    if let Some(value) = cli_args.get("max_events_per_drain") {
        if let Ok(max) = value.parse::<usize>() {
            config.dispatch.max_events_per_drain = max;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        set_log_dir(config, value);
    }
}
