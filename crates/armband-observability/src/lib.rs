// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # armband-observability
//!
//! Logging infrastructure shared by the armband crates, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files with daily rotation and run retention

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known armband crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "armband",
    "armband-device",
    "armband-config",
    "armband-observability",
];

/// Tracing target for a crate name (`armband-device` -> `armband_device`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
