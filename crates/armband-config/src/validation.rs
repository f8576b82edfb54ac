// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are usable before any session is created.

use crate::{ArmbandConfig, ConfigError, ConfigResult};

/// Levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Formats accepted by `logging.format`
pub const LOG_FORMATS: [&str; 2] = ["text", "compact"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &ArmbandConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &ArmbandConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.profiles.storage_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "profiles.storage_dir".to_string(),
        });
    }
    if let Some(file) = &config.logging.file {
        if file.dir.as_os_str().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: "logging.file.dir".to_string(),
            });
        }
    }
}

fn validate_value_ranges(config: &ArmbandConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    if let Some(file) = &config.logging.file {
        if file.retention_runs == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: "logging.file.retention_runs".to_string(),
                reason: "must keep at least the current run".to_string(),
            });
        }
    }

    if config.profiles.storage_dir.is_file() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "profiles.storage_dir".to_string(),
            reason: format!("{} is a file", config.profiles.storage_dir.display()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_storage_dir() {
        let mut config = ArmbandConfig::default();
        config.profiles.storage_dir = PathBuf::new();

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("profiles.storage_dir"));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ArmbandConfig::default();
        config.logging.level = "verbose".to_string();

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("logging.level"));
            assert!(msg.contains("verbose"));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = ArmbandConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_storage_dir_pointing_at_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = ArmbandConfig::default();
        config.profiles.storage_dir = file.path().to_path_buf();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_logging_format_and_file_section() {
        let mut config = ArmbandConfig::default();
        config.logging.format = "json".to_string();
        config.logging.file = Some(crate::LogFileConfig {
            retention_runs: 0,
            ..Default::default()
        });

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("logging.format"));
            assert!(msg.contains("logging.file.retention_runs"));
        } else {
            panic!("expected validation error");
        }

        config.logging.format = "Compact".to_string();
        config.logging.file = Some(crate::LogFileConfig::default());
        assert!(validate_config(&config).is_ok());
    }
}

