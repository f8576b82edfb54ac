// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Value types delivered to subscribers
//!
//! These mirror what the native SDK reports: three-axis vectors for the
//! accelerometer (g) and gyroscope (deg/s), a unit quaternion for orientation,
//! the classified hand pose and a signed RSSI in dBm.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Three-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Rotation quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Hand pose classified by the armband
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pose {
    /// Arm present, no gesture
    Rest,
    Fist,
    WaveIn,
    WaveOut,
    FingersSpread,
    TwistIn,
    /// No classification available (before first observation or off-arm)
    #[default]
    Unknown,
}

impl Pose {
    /// Native code for `Unknown`
    pub const UNKNOWN_CODE: u32 = 0xFFFF;

    /// Decode a native pose code. Codes this binding does not know map to `Unknown`.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Pose::Rest,
            1 => Pose::Fist,
            2 => Pose::WaveIn,
            3 => Pose::WaveOut,
            4 => Pose::FingersSpread,
            5 => Pose::TwistIn,
            _ => Pose::Unknown,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Pose::Rest => 0,
            Pose::Fist => 1,
            Pose::WaveIn => 2,
            Pose::WaveOut => 3,
            Pose::FingersSpread => 4,
            Pose::TwistIn => 5,
            Pose::Unknown => Self::UNKNOWN_CODE,
        }
    }

    /// True for poses that represent an actual gesture
    pub fn is_gesture(&self) -> bool {
        !matches!(self, Pose::Rest | Pose::Unknown)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pose::Rest => "rest",
            Pose::Fist => "fist",
            Pose::WaveIn => "wave_in",
            Pose::WaveOut => "wave_out",
            Pose::FingersSpread => "fingers_spread",
            Pose::TwistIn => "twist_in",
            Pose::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Vibration feedback strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VibrationType {
    Short,
    Medium,
    Long,
}

impl VibrationType {
    pub fn code(&self) -> u32 {
        match self {
            VibrationType::Short => 0,
            VibrationType::Medium => 1,
            VibrationType::Long => 2,
        }
    }
}

/// Event timestamp in microseconds since the Unix epoch, as reported by the native SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn to_system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_micros(self.0)
    }
}
