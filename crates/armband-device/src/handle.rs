// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Native device handles and hardware identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Opaque native handle for one device connection.
///
/// The native SDK hands these out at connect time and invalidates them on
/// disconnect. The value is treated as a capability token: sessions check it
/// against the backend before every use and never interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(NonZeroU64);

impl DeviceHandle {
    /// Wrap a raw native handle value. Zero is not a valid handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(DeviceHandle)
    }

    /// The raw value to pass back into the native SDK
    pub fn as_raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// Stable hardware identifier (48-bit MAC address) of a physical armband.
///
/// Unlike [`DeviceHandle`] this survives reconnects, so training profiles are
/// keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HardwareId(u64);

impl HardwareId {
    pub const fn new(mac: u64) -> Self {
        HardwareId(mac & 0x0000_FFFF_FFFF_FFFF)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Twelve lowercase hex digits, suitable for file names
    pub fn to_hex(&self) -> String {
        format!("{:012x}", self.0)
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_handle_rejected() {
        assert!(DeviceHandle::from_raw(0).is_none());
        assert_eq!(DeviceHandle::from_raw(42).unwrap().as_raw(), 42);
    }

    #[test]
    fn test_hardware_id_formatting() {
        let id = HardwareId::new(0xD0_5F_B8_12_34_56);
        assert_eq!(id.to_string(), "d0:5f:b8:12:34:56");
        assert_eq!(id.to_hex(), "d05fb8123456");
    }

    #[test]
    fn test_hardware_id_masks_to_48_bits() {
        let id = HardwareId::new(0xFFFF_0000_0000_0001);
        assert_eq!(id.as_u64(), 1);
    }
}
