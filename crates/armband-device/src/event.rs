// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed event records and subscriber payloads

use std::fmt;
use std::sync::Arc;

use crate::device::Device;
use crate::native::{EventKind, NativeEvent, OrientationIndex};
use crate::types::{Pose, Quaternion, Timestamp, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// One orientation bundle: the three readings sampled together
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub acceleration: Vector3,
    pub angular_velocity: Vector3,
    pub orientation: Quaternion,
}

/// Kind-specific part of a decoded record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordPayload {
    Connection(ConnectionState),
    Motion(MotionSample),
    Pose(Pose),
    Signal(i8),
}

/// A raw native event decoded for a resolved session.
///
/// Only the dispatcher builds these.
#[derive(Clone)]
pub struct DeviceRecord {
    device: Arc<Device>,
    timestamp: Timestamp,
    payload: RecordPayload,
}

impl DeviceRecord {
    /// Decode `event` for `device`. Returns `None` for event kinds this binding
    /// does not know.
    pub(crate) fn decode<E>(device: &Arc<Device>, event: &E) -> Option<Self>
    where
        E: NativeEvent + ?Sized,
    {
        let kind = EventKind::from_code(event.kind_code())?;
        let payload = match kind {
            EventKind::Connected => RecordPayload::Connection(ConnectionState::Connected),
            EventKind::Disconnected => RecordPayload::Connection(ConnectionState::Disconnected),
            EventKind::Orientation => RecordPayload::Motion(MotionSample {
                acceleration: Vector3::new(
                    event.accelerometer(0),
                    event.accelerometer(1),
                    event.accelerometer(2),
                ),
                angular_velocity: Vector3::new(
                    event.gyroscope(0),
                    event.gyroscope(1),
                    event.gyroscope(2),
                ),
                orientation: Quaternion::new(
                    event.orientation(OrientationIndex::X),
                    event.orientation(OrientationIndex::Y),
                    event.orientation(OrientationIndex::Z),
                    event.orientation(OrientationIndex::W),
                ),
            }),
            EventKind::Pose => RecordPayload::Pose(Pose::from_code(event.pose_code())),
            EventKind::Rssi => RecordPayload::Signal(event.rssi()),
        };

        Some(DeviceRecord {
            device: Arc::clone(device),
            timestamp: Timestamp::from_micros(event.timestamp()),
            payload,
        })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &RecordPayload {
        &self.payload
    }

    pub(crate) fn event<T>(&self, data: T) -> DeviceEvent<T> {
        DeviceEvent {
            device: Arc::clone(&self.device),
            timestamp: self.timestamp,
            data,
        }
    }
}

impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("device", &self.device.hardware_id())
            .field("timestamp", &self.timestamp)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Immutable payload handed to subscribers
#[derive(Clone)]
pub struct DeviceEvent<T> {
    device: Arc<Device>,
    timestamp: Timestamp,
    data: T,
}

impl<T> DeviceEvent<T> {
    /// The session the event originated from
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for DeviceEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEvent")
            .field("device", &self.device.hardware_id())
            .field("timestamp", &self.timestamp)
            .field("data", &self.data)
            .finish()
    }
}

pub type ConnectionEvent = DeviceEvent<()>;
pub type PoseEvent = DeviceEvent<Pose>;
pub type OrientationEvent = DeviceEvent<Quaternion>;
pub type AccelerometerEvent = DeviceEvent<Vector3>;
pub type GyroscopeEvent = DeviceEvent<Vector3>;
pub type RssiEvent = DeviceEvent<i8>;
