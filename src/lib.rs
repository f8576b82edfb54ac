//! # armband - session binding for EMG armbands
//!
//! Turns the raw, handle-tagged record stream of a native armband SDK into
//! per-device sessions with typed events, edge-triggered pose changes and
//! persistent training profiles.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use armband::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ArmbandConfig::default();
//! let backend = ScriptedBackend::new();
//! let registry = Arc::new(DeviceRegistry::new(backend.shared()));
//! let dispatcher = EventDispatcher::from_config(Arc::clone(&registry), &config);
//!
//! dispatcher.drain(&mut backend.source())?;
//! for device in registry.live_devices() {
//!     println!("{} is in pose {}", device.hardware_id(), device.pose());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: armband-config, armband-observability      │
//! │  (TOML + overrides, tracing setup)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Sessions: armband-device                               │
//! │  (registry, dispatcher, pose tracking, profiles)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use armband_config as config;
pub use armband_device as device;
pub use armband_observability as observability;

/// Observability settings for the `[logging]` section of `armband.toml`.
///
/// An unrecognised format falls back to text; `validate_config` reports it
/// before this is reached.
pub fn logging_config(config: &config::LoggingConfig) -> observability::LoggingConfig {
    observability::LoggingConfig {
        level: config.level.clone(),
        format: config
            .format
            .parse()
            .unwrap_or(observability::LogFormat::Text),
        file: config
            .file
            .as_ref()
            .map(|file| observability::FileLoggingConfig {
                log_dir: file.dir.clone(),
                retention_days: file.retention_days,
                retention_runs: file.retention_runs,
            }),
    }
}

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, validate_config, ArmbandConfig};
    pub use crate::device::{
        Device, DeviceError, DeviceEvent, DeviceRegistry, DispatchOutcome, EventDispatcher,
        EventSource, HardwareId, NativeBackend, NativeEvent, Pose, Quaternion, RawEvent,
        ScriptedBackend, TrainingProfiles, Vector3, VibrationType,
    };
    pub use crate::logging_config;
    pub use crate::observability::{init_logging, parse_debug_flags, CrateDebugFlags};
}
