// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for armband device sessions

use crate::handle::{DeviceHandle, HardwareId};
use crate::signal::{Channel, SubscriberError};
use crate::training::StoreError;

/// Result type alias using DeviceError
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Failure reported by the native SDK for a per-handle call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("native call '{call}' failed: {reason}")]
pub struct NativeError {
    pub call: &'static str,
    pub reason: String,
}

impl NativeError {
    pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in device session operations.
///
/// `NullHandle`, `Disconnected`, `InvalidHandle`, `ReentrantDispatch` and
/// `ProfileEmpty` are contract violations by the integration layer. `Store`
/// and `Native` are runtime
/// failures the caller may recover from. `Subscriber` carries a failure raised
/// by an application callback during fan-out.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The native source never emits a zero handle
    #[error("cannot resolve a null device handle")]
    NullHandle,

    /// Operation on a session whose handle was invalidated by Disconnected
    #[error("device {0} is disconnected")]
    Disconnected(HardwareId),

    /// The backend no longer recognises a handle the session still holds
    #[error("native handle {0} is no longer valid")]
    InvalidHandle(DeviceHandle),

    /// A subscriber dispatched a record for the session it is being called from
    #[error("re-entrant dispatch for device {0} from inside one of its callbacks")]
    ReentrantDispatch(HardwareId),

    /// Save requested before the profile was trained or loaded
    #[error("training profile for device {0} holds no calibration data")]
    ProfileEmpty(HardwareId),

    /// Durable profile storage failed
    #[error("profile storage error: {0}")]
    Store(#[from] StoreError),

    /// The native SDK rejected a call
    #[error(transparent)]
    Native(#[from] NativeError),

    /// A subscriber callback failed; remaining subscribers were not called
    #[error("{channel} subscriber failed: {source}")]
    Subscriber {
        channel: Channel,
        #[source]
        source: SubscriberError,
    },
}

impl DeviceError {
    /// Check if the error reflects a programming error rather than a runtime condition
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            DeviceError::NullHandle
                | DeviceError::Disconnected(_)
                | DeviceError::InvalidHandle(_)
                | DeviceError::ReentrantDispatch(_)
                | DeviceError::ProfileEmpty(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_classification() {
        assert!(DeviceError::NullHandle.is_contract_violation());
        assert!(DeviceError::Disconnected(HardwareId::new(1)).is_contract_violation());
        assert!(DeviceError::ReentrantDispatch(HardwareId::new(1)).is_contract_violation());
        assert!(!DeviceError::Native(NativeError::new("vibrate", "busy")).is_contract_violation());
        assert!(!DeviceError::Store(StoreError::Unavailable("offline".into())).is_contract_violation());
    }

    #[test]
    fn test_subscriber_error_message() {
        let err = DeviceError::Subscriber {
            channel: Channel::PoseChanged,
            source: "renderer went away".into(),
        };
        assert_eq!(err.to_string(), "pose-changed subscriber failed: renderer went away");
    }
}
