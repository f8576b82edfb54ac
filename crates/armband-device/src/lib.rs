// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Armband Device
//!
//! Session layer between a native armband SDK and application code.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Native Event Source               │  ← handle-tagged raw records
//! └─────────────────────────────────────┘
//!           ↓
//! ┌─────────────────────────────────────┐
//! │   EventDispatcher                   │  ← resolve, decode, route
//! │   DeviceRegistry                    │  ← one session per live handle
//! └─────────────────────────────────────┘
//!           ↓
//! ┌─────────────────────────────────────┐
//! │   Device                            │  ← pose edge detection, fan-out
//! │   TrainingProfiles                  │  ← lazy profile, train/save/load
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use armband_device::{DeviceRegistry, EventDispatcher, Pose, ScriptedBackend, VibrationType};
//!
//! let backend = ScriptedBackend::new();
//! let registry = Arc::new(DeviceRegistry::new(backend.shared()));
//! let dispatcher = EventDispatcher::new(Arc::clone(&registry));
//!
//! let device = registry.resolve(1)?;
//! device.on_pose_changed(|event| {
//!     if *event.data() == Pose::Fist {
//!         event.device().vibrate(VibrationType::Medium)?;
//!     }
//!     Ok(())
//! });
//!
//! dispatcher.drain(&mut backend.source())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handle;
pub mod native;
pub mod registry;
pub mod scripted;
pub mod signal;
pub mod training;
pub mod types;

pub use device::Device;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{DeviceError, NativeError, Result};
pub use event::{
    AccelerometerEvent, ConnectionEvent, ConnectionState, DeviceEvent, DeviceRecord,
    GyroscopeEvent, MotionSample, OrientationEvent, PoseEvent, RecordPayload, RssiEvent,
};
pub use handle::{DeviceHandle, HardwareId};
pub use native::{EventKind, EventSource, NativeBackend, NativeEvent, OrientationIndex, RawEvent};
pub use registry::{DeviceRegistry, Resolved};
pub use scripted::{ScriptedBackend, ScriptedSource};
pub use signal::{Channel, SubscriberError, SubscriberResult, Subscription, SubscriptionId};
pub use training::{
    FileProfileStore, MemoryProfileStore, ProfileBlob, ProfileStore, StoreError, TrainingProfile,
    TrainingProfiles,
};
pub use types::{Pose, Quaternion, Timestamp, Vector3, VibrationType};
