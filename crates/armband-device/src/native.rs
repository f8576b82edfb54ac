// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the native armband SDK.
//!
//! The SDK is an external collaborator. This module only describes what the
//! binding consumes from it:
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ EventSource                  │     │ NativeBackend                │
//! │ - next_event()               │     │ - is_valid(handle)           │
//! │   yields NativeEvent records │     │ - mac_address(handle)        │
//! └──────────────┬───────────────┘     │ - vibrate / request_rssi     │
//!                │                     │ - calibrate                  │
//!                ▼                     └──────────────▲───────────────┘
//!        EventDispatcher ──► DeviceRegistry ──► Device ┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::NativeError;
use crate::handle::{DeviceHandle, HardwareId};
use crate::types::{Pose, VibrationType};

/// Event kinds this binding understands.
///
/// The native SDK may emit others (pairing notifications, newer firmware
/// events); those have no `EventKind` and are dropped by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    /// Accelerometer, gyroscope and orientation sampled together
    Orientation,
    Pose,
    Rssi,
}

impl EventKind {
    pub const PAIRED_CODE: u32 = 0;
    pub const CONNECTED_CODE: u32 = 1;
    pub const DISCONNECTED_CODE: u32 = 2;
    pub const ORIENTATION_CODE: u32 = 3;
    pub const POSE_CODE: u32 = 4;
    pub const RSSI_CODE: u32 = 5;

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            Self::CONNECTED_CODE => Some(EventKind::Connected),
            Self::DISCONNECTED_CODE => Some(EventKind::Disconnected),
            Self::ORIENTATION_CODE => Some(EventKind::Orientation),
            Self::POSE_CODE => Some(EventKind::Pose),
            Self::RSSI_CODE => Some(EventKind::Rssi),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            EventKind::Connected => Self::CONNECTED_CODE,
            EventKind::Disconnected => Self::DISCONNECTED_CODE,
            EventKind::Orientation => Self::ORIENTATION_CODE,
            EventKind::Pose => Self::POSE_CODE,
            EventKind::Rssi => Self::RSSI_CODE,
        }
    }
}

/// Component index into the orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationIndex {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

/// Read access to one raw event record from the native SDK.
///
/// Accessors for a kind other than the record's own return whatever the SDK
/// returns for them; the dispatcher only reads the ones matching `kind_code`.
pub trait NativeEvent {
    fn handle(&self) -> u64;
    fn kind_code(&self) -> u32;
    /// Microseconds since the Unix epoch
    fn timestamp(&self) -> u64;
    fn accelerometer(&self, axis: usize) -> f32;
    fn gyroscope(&self, axis: usize) -> f32;
    fn orientation(&self, index: OrientationIndex) -> f32;
    fn pose_code(&self) -> u32;
    fn rssi(&self) -> i8;
}

/// Pull-based stream of raw records, in delivery order
pub trait EventSource {
    type Event: NativeEvent;

    /// Next pending record, or `None` when nothing is queued
    fn next_event(&mut self) -> Option<Self::Event>;
}

/// Per-handle calls into the native SDK
pub trait NativeBackend: Send + Sync {
    /// Whether the SDK still considers `handle` live
    fn is_valid(&self, handle: DeviceHandle) -> bool;

    /// Stable hardware identifier of the device behind `handle`
    fn mac_address(&self, handle: DeviceHandle) -> HardwareId;

    fn vibrate(&self, handle: DeviceHandle, vibration: VibrationType) -> Result<(), NativeError>;

    /// Ask for an out-of-band RSSI sample. The result arrives later as an Rssi event.
    fn request_rssi(&self, handle: DeviceHandle) -> Result<(), NativeError>;

    /// Run the SDK's calibration routine, starting from the current profile
    /// data if there is any, and return the new opaque profile data.
    fn calibrate(&self, handle: DeviceHandle, current: Option<&[u8]>) -> Result<Vec<u8>, NativeError>;
}

/// Plain-data event record.
///
/// Used by the scripted backend, the replay tool and tests. Fields not
/// relevant to `kind` are left at their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub handle: u64,
    pub kind: u32,
    pub timestamp_us: u64,
    pub accelerometer: [f32; 3],
    pub gyroscope: [f32; 3],
    /// x, y, z, w
    pub orientation: [f32; 4],
    pub pose: u32,
    pub rssi: i8,
}

impl RawEvent {
    pub fn new(handle: u64, kind: u32, timestamp_us: u64) -> Self {
        Self {
            handle,
            kind,
            timestamp_us,
            orientation: [0.0, 0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    pub fn connected(handle: u64, timestamp_us: u64) -> Self {
        Self::new(handle, EventKind::CONNECTED_CODE, timestamp_us)
    }

    pub fn disconnected(handle: u64, timestamp_us: u64) -> Self {
        Self::new(handle, EventKind::DISCONNECTED_CODE, timestamp_us)
    }

    pub fn pose(handle: u64, timestamp_us: u64, pose: Pose) -> Self {
        Self {
            pose: pose.code(),
            ..Self::new(handle, EventKind::POSE_CODE, timestamp_us)
        }
    }

    pub fn rssi(handle: u64, timestamp_us: u64, rssi: i8) -> Self {
        Self {
            rssi,
            ..Self::new(handle, EventKind::RSSI_CODE, timestamp_us)
        }
    }

    pub fn orientation(
        handle: u64,
        timestamp_us: u64,
        accelerometer: [f32; 3],
        gyroscope: [f32; 3],
        orientation: [f32; 4],
    ) -> Self {
        Self {
            accelerometer,
            gyroscope,
            orientation,
            ..Self::new(handle, EventKind::ORIENTATION_CODE, timestamp_us)
        }
    }
}

impl NativeEvent for RawEvent {
    fn handle(&self) -> u64 {
        self.handle
    }

    fn kind_code(&self) -> u32 {
        self.kind
    }

    fn timestamp(&self) -> u64 {
        self.timestamp_us
    }

    fn accelerometer(&self, axis: usize) -> f32 {
        self.accelerometer.get(axis).copied().unwrap_or_default()
    }

    fn gyroscope(&self, axis: usize) -> f32 {
        self.gyroscope.get(axis).copied().unwrap_or_default()
    }

    fn orientation(&self, index: OrientationIndex) -> f32 {
        self.orientation[index as usize]
    }

    fn pose_code(&self) -> u32 {
        self.pose
    }

    fn rssi(&self) -> i8 {
        self.rssi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_codes() {
        for kind in [
            EventKind::Connected,
            EventKind::Disconnected,
            EventKind::Orientation,
            EventKind::Pose,
            EventKind::Rssi,
        ] {
            assert_eq!(EventKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EventKind::from_code(EventKind::PAIRED_CODE), None);
        assert_eq!(EventKind::from_code(99), None);
    }

    #[test]
    fn test_raw_event_json_defaults() {
        let event: RawEvent = serde_json::from_str(r#"{"handle": 7, "kind": 4, "pose": 1}"#).unwrap();
        assert_eq!(event.handle(), 7);
        assert_eq!(event.kind_code(), EventKind::POSE_CODE);
        assert_eq!(Pose::from_code(event.pose_code()), Pose::Fist);
        assert_eq!(event.timestamp(), 0);
    }

    #[test]
    fn test_orientation_accessors() {
        let event = RawEvent::orientation(1, 0, [0.1, 0.2, 0.3], [1.0, 2.0, 3.0], [0.5, 0.5, 0.5, 0.5]);
        assert_eq!(event.accelerometer(2), 0.3);
        assert_eq!(event.gyroscope(0), 1.0);
        assert_eq!(event.orientation(OrientationIndex::W), 0.5);
        assert_eq!(event.accelerometer(9), 0.0);
    }
}
