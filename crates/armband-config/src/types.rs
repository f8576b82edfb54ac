// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `armband.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArmbandConfig {
    pub profiles: ProfilesConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

/// Training profile storage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilesConfig {
    /// Directory holding one profile file per armband
    pub storage_dir: PathBuf,
    /// Restore a stored profile when a session is first seen
    pub load_on_connect: bool,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./profiles"),
            load_on_connect: true,
        }
    }
}

/// Event dispatch limits
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Records pulled per drain call (0 = until the source is empty)
    pub max_events_per_drain: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for crates without a debug flag
    pub level: String,
    /// Console format: "text" or "compact"
    pub format: String,
    /// JSON log files, one folder per run. Only honoured by builds with the
    /// `file-logging` feature.
    pub file: Option<LogFileConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

/// `[logging.file]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogFileConfig {
    /// Base directory for run folders
    pub dir: PathBuf,
    /// Remove run folders older than this many days
    pub retention_days: u64,
    /// Keep at most this many run folders
    pub retention_runs: usize,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ArmbandConfig = toml::from_str(
            r#"
            [profiles]
            load_on_connect = false
            "#,
        )
        .unwrap();

        assert!(!config.profiles.load_on_connect);
        assert_eq!(config.profiles.storage_dir, PathBuf::from("./profiles"));
        assert_eq!(config.dispatch.max_events_per_drain, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_full_file() {
        let config: ArmbandConfig = toml::from_str(
            r#"
            [profiles]
            storage_dir = "/var/lib/armband"
            load_on_connect = true

            [dispatch]
            max_events_per_drain = 64

            [logging]
            level = "debug"
            format = "compact"

            [logging.file]
            dir = "/var/log/armband"
            retention_runs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.profiles.storage_dir, PathBuf::from("/var/lib/armband"));
        assert_eq!(config.dispatch.max_events_per_drain, 64);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "compact");
        let file = config.logging.file.unwrap();
        assert_eq!(file.dir, PathBuf::from("/var/log/armband"));
        assert_eq!(file.retention_runs, 3);
        assert_eq!(file.retention_days, 30);
    }
}
