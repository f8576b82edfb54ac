// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device session - one per physical armband connection.
//!
//! A `Device` owns the native handle for as long as the handle is valid,
//! tracks the last observed pose, the trained flag and the lazily created
//! training profile, and exposes one subscription point per event kind.
//!
//! ## Edge vs. level events
//!
//! Pose records are edge-triggered: pose-changed subscribers only hear about a
//! pose when it differs from the last one observed. Every other record kind is
//! forwarded to its subscribers once per record, repeats included.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use tracing::{debug, info};

use crate::error::{DeviceError, Result};
use crate::event::{
    AccelerometerEvent, ConnectionEvent, ConnectionState, DeviceRecord, GyroscopeEvent,
    OrientationEvent, PoseEvent, RecordPayload, RssiEvent,
};
use crate::handle::{DeviceHandle, HardwareId};
use crate::native::NativeBackend;
use crate::signal::{Channel, Signal, SubscriberResult, Subscription};
use crate::training::TrainingProfile;
use crate::types::{Pose, VibrationType};

#[derive(Debug)]
struct DeviceState {
    handle: Option<DeviceHandle>,
    pose: Pose,
    trained: bool,
}

#[derive(Debug, Default)]
struct DeviceSignals {
    connected: Signal<ConnectionEvent>,
    disconnected: Signal<ConnectionEvent>,
    pose_changed: Signal<PoseEvent>,
    orientation: Signal<OrientationEvent>,
    accelerometer: Signal<AccelerometerEvent>,
    gyroscope: Signal<GyroscopeEvent>,
    signal_strength: Signal<RssiEvent>,
}

impl DeviceSignals {
    fn clear(&self) {
        self.connected.disconnect_all();
        self.disconnected.disconnect_all();
        self.pose_changed.disconnect_all();
        self.orientation.disconnect_all();
        self.accelerometer.disconnect_all();
        self.gyroscope.disconnect_all();
        self.signal_strength.disconnect_all();
    }
}

/// Managed session for one armband
pub struct Device {
    hardware_id: HardwareId,
    backend: Arc<dyn NativeBackend>,
    state: Mutex<DeviceState>,
    /// Held for a whole record: state transition plus fan-out
    dispatch_lock: Mutex<()>,
    /// Thread currently holding `dispatch_lock`
    dispatch_owner: Mutex<Option<ThreadId>>,
    profile: OnceLock<Arc<TrainingProfile>>,
    signals: DeviceSignals,
}

impl Device {
    pub(crate) fn new(handle: DeviceHandle, backend: Arc<dyn NativeBackend>) -> Arc<Self> {
        let hardware_id = backend.mac_address(handle);
        debug!(
            "[DEVICE] Session created for {} (handle {})",
            hardware_id, handle
        );
        Arc::new(Device {
            hardware_id,
            backend,
            state: Mutex::new(DeviceState {
                handle: Some(handle),
                pose: Pose::Unknown,
                trained: false,
            }),
            dispatch_lock: Mutex::new(()),
            dispatch_owner: Mutex::new(None),
            profile: OnceLock::new(),
            signals: DeviceSignals::default(),
        })
    }

    pub fn hardware_id(&self) -> HardwareId {
        self.hardware_id
    }

    /// Native handle, or `None` once the device has disconnected
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.state.lock().handle
    }

    /// True while the session holds a handle the backend still recognises
    pub fn is_connected(&self) -> bool {
        let handle = self.state.lock().handle;
        handle.is_some_and(|handle| self.backend.is_valid(handle))
    }

    /// Last observed pose (`Unknown` until the first pose record)
    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    pub fn is_trained(&self) -> bool {
        self.state.lock().trained
    }

    /// Trigger vibration feedback
    pub fn vibrate(&self, vibration: VibrationType) -> Result<()> {
        let handle = self.live_handle()?;
        self.backend.vibrate(handle, vibration)?;
        Ok(())
    }

    /// Ask the device for a signal-strength sample.
    ///
    /// The value is delivered later through the signal-strength subscription.
    pub fn request_rssi(&self) -> Result<()> {
        let handle = self.live_handle()?;
        self.backend.request_rssi(handle)?;
        Ok(())
    }

    //region Subscriptions

    pub fn on_connected<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::Connected,
            id: self.signals.connected.connect(f),
        }
    }

    pub fn on_disconnected<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::Disconnected,
            id: self.signals.disconnected.connect(f),
        }
    }

    pub fn on_pose_changed<F>(&self, f: F) -> Subscription
    where
        F: Fn(&PoseEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::PoseChanged,
            id: self.signals.pose_changed.connect(f),
        }
    }

    pub fn on_orientation<F>(&self, f: F) -> Subscription
    where
        F: Fn(&OrientationEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::OrientationData,
            id: self.signals.orientation.connect(f),
        }
    }

    pub fn on_accelerometer<F>(&self, f: F) -> Subscription
    where
        F: Fn(&AccelerometerEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::AccelerometerData,
            id: self.signals.accelerometer.connect(f),
        }
    }

    pub fn on_gyroscope<F>(&self, f: F) -> Subscription
    where
        F: Fn(&GyroscopeEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::GyroscopeData,
            id: self.signals.gyroscope.connect(f),
        }
    }

    pub fn on_signal_strength<F>(&self, f: F) -> Subscription
    where
        F: Fn(&RssiEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        Subscription {
            channel: Channel::SignalStrength,
            id: self.signals.signal_strength.connect(f),
        }
    }

    /// Remove a subscription. Returns false if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let id = subscription.id;
        match subscription.channel {
            Channel::Connected => self.signals.connected.disconnect(id),
            Channel::Disconnected => self.signals.disconnected.disconnect(id),
            Channel::PoseChanged => self.signals.pose_changed.disconnect(id),
            Channel::OrientationData => self.signals.orientation.disconnect(id),
            Channel::AccelerometerData => self.signals.accelerometer.disconnect(id),
            Channel::GyroscopeData => self.signals.gyroscope.disconnect(id),
            Channel::SignalStrength => self.signals.signal_strength.disconnect(id),
        }
    }

    //endregion

    //region Crate internals

    /// Route a decoded record to subscribers.
    ///
    /// Runs callbacks synchronously on the caller's thread. Concurrent records
    /// for the same session are serialised. A callback that dispatches another
    /// record for this same session gets `ReentrantDispatch` instead of
    /// blocking on itself.
    pub(crate) fn handle_record(&self, record: &DeviceRecord) -> Result<()> {
        debug_assert!(std::ptr::eq(Arc::as_ptr(record.device()), self));
        let _dispatch = self.lock_dispatch()?;

        match *record.payload() {
            RecordPayload::Connection(ConnectionState::Connected) => {
                emit(Channel::Connected, &self.signals.connected, &record.event(()))
            }
            RecordPayload::Connection(ConnectionState::Disconnected) => emit(
                Channel::Disconnected,
                &self.signals.disconnected,
                &record.event(()),
            ),
            RecordPayload::Pose(pose) => {
                if !self.observe_pose(pose) {
                    return Ok(());
                }
                emit(
                    Channel::PoseChanged,
                    &self.signals.pose_changed,
                    &record.event(pose),
                )
            }
            RecordPayload::Motion(sample) => {
                emit(
                    Channel::AccelerometerData,
                    &self.signals.accelerometer,
                    &record.event(sample.acceleration),
                )?;
                emit(
                    Channel::GyroscopeData,
                    &self.signals.gyroscope,
                    &record.event(sample.angular_velocity),
                )?;
                emit(
                    Channel::OrientationData,
                    &self.signals.orientation,
                    &record.event(sample.orientation),
                )
            }
            RecordPayload::Signal(rssi) => emit(
                Channel::SignalStrength,
                &self.signals.signal_strength,
                &record.event(rssi),
            ),
        }
    }

    fn lock_dispatch(&self) -> Result<DispatchGuard<'_>> {
        let current = thread::current().id();
        if *self.dispatch_owner.lock() == Some(current) {
            return Err(DeviceError::ReentrantDispatch(self.hardware_id));
        }
        let lock = self.dispatch_lock.lock();
        *self.dispatch_owner.lock() = Some(current);
        Ok(DispatchGuard {
            _lock: lock,
            owner: &self.dispatch_owner,
        })
    }

    /// Store `pose` if it differs from the last observed one
    fn observe_pose(&self, pose: Pose) -> bool {
        let mut state = self.state.lock();
        if state.pose == pose {
            return false;
        }
        debug!("[DEVICE] {} pose {} -> {}", self.hardware_id, state.pose, pose);
        state.pose = pose;
        true
    }

    /// The handle, checked against the backend, or a contract-violation error
    pub(crate) fn live_handle(&self) -> Result<DeviceHandle> {
        let handle = self
            .state
            .lock()
            .handle
            .ok_or(DeviceError::Disconnected(self.hardware_id))?;
        if !self.backend.is_valid(handle) {
            return Err(DeviceError::InvalidHandle(handle));
        }
        Ok(handle)
    }

    /// Drop the handle and every subscriber. The session stays usable for
    /// reads but every native call fails.
    pub(crate) fn mark_disconnected(&self) {
        let released = self.state.lock().handle.take();
        if let Some(handle) = released {
            info!(
                "[DEVICE] {} disconnected, handle {} released",
                self.hardware_id, handle
            );
        }
        // Callbacks often capture the session itself
        self.signals.clear();
    }

    pub(crate) fn set_trained(&self, trained: bool) {
        self.state.lock().trained = trained;
    }

    pub(crate) fn backend(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }

    pub(crate) fn profile_cell(&self) -> &OnceLock<Arc<TrainingProfile>> {
        &self.profile
    }

    //endregion
}

/// Clears the owner before the dispatch lock is released
struct DispatchGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    owner: &'a Mutex<Option<ThreadId>>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *self.owner.lock() = None;
    }
}

fn emit<T>(channel: Channel, signal: &Signal<T>, value: &T) -> Result<()> {
    signal
        .emit(value)
        .map_err(|source| DeviceError::Subscriber { channel, source })
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Device")
            .field("hardware_id", &self.hardware_id)
            .field("handle", &state.handle)
            .field("pose", &state.pose)
            .field("trained", &state.trained)
            .field("profile_loaded", &self.profile.get().is_some())
            .finish()
    }
}
