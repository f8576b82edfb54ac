// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-in for the native SDK.
//!
//! `ScriptedBackend` plays both native roles: it answers per-handle calls and
//! queues raw records that a [`ScriptedSource`] hands to the dispatcher. It is
//! used by tests and by the replay tool, where no hardware is attached.

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::error::NativeError;
use crate::handle::{DeviceHandle, HardwareId};
use crate::native::{EventKind, EventSource, NativeBackend, RawEvent};
use crate::types::VibrationType;

/// RSSI reported in reply to `request_rssi` when no value was scripted
pub const DEFAULT_RSSI: i8 = -55;

#[derive(Debug, Default)]
struct ScriptState {
    macs: AHashMap<u64, HardwareId>,
    live: AHashSet<u64>,
    pending: VecDeque<RawEvent>,
    vibrations: Vec<(DeviceHandle, VibrationType)>,
    rssi_replies: AHashMap<u64, i8>,
    calibrations: usize,
    clock_us: u64,
    failing_calls: AHashSet<&'static str>,
}

/// Scripted native backend. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// This backend as the trait object sessions hold
    pub fn shared(&self) -> Arc<dyn NativeBackend> {
        Arc::new(self.clone())
    }

    /// A source yielding the records queued on this backend
    pub fn source(&self) -> ScriptedSource {
        ScriptedSource {
            state: Arc::clone(&self.state),
        }
    }

    /// Make `raw_handle` a live handle for the device with hardware id `mac`
    pub fn attach(&self, raw_handle: u64, mac: u64) {
        let mut state = self.state.lock();
        state.macs.insert(raw_handle, HardwareId::new(mac));
        state.live.insert(raw_handle);
    }

    /// Invalidate `raw_handle` without queueing a Disconnected record
    pub fn detach(&self, raw_handle: u64) {
        self.state.lock().live.remove(&raw_handle);
    }

    /// Queue a raw record for the source to deliver
    pub fn push(&self, event: RawEvent) {
        self.state.lock().pending.push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = RawEvent>>(&self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    /// RSSI value to report the next time `raw_handle` is asked
    pub fn set_rssi_reply(&self, raw_handle: u64, rssi: i8) {
        self.state.lock().rssi_replies.insert(raw_handle, rssi);
    }

    /// Make the named native call ("vibrate", "request_rssi", "calibrate") fail
    pub fn fail_call(&self, call: &'static str) {
        self.state.lock().failing_calls.insert(call);
    }

    pub fn vibrations(&self) -> Vec<(DeviceHandle, VibrationType)> {
        self.state.lock().vibrations.clone()
    }

    pub fn calibration_count(&self) -> usize {
        self.state.lock().calibrations
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn check(state: &ScriptState, call: &'static str, handle: DeviceHandle) -> Result<(), NativeError> {
        if state.failing_calls.contains(call) {
            return Err(NativeError::new(call, "scripted failure"));
        }
        if !state.live.contains(&handle.as_raw()) {
            return Err(NativeError::new(call, format!("handle {} is not live", handle)));
        }
        Ok(())
    }
}

impl NativeBackend for ScriptedBackend {
    fn is_valid(&self, handle: DeviceHandle) -> bool {
        self.state.lock().live.contains(&handle.as_raw())
    }

    fn mac_address(&self, handle: DeviceHandle) -> HardwareId {
        self.state
            .lock()
            .macs
            .get(&handle.as_raw())
            .copied()
            .unwrap_or_else(|| HardwareId::new(handle.as_raw()))
    }

    fn vibrate(&self, handle: DeviceHandle, vibration: VibrationType) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        Self::check(&state, "vibrate", handle)?;
        debug!("[SCRIPTED] vibrate {:?} on {}", vibration, handle);
        state.vibrations.push((handle, vibration));
        Ok(())
    }

    fn request_rssi(&self, handle: DeviceHandle) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        Self::check(&state, "request_rssi", handle)?;
        let rssi = state
            .rssi_replies
            .get(&handle.as_raw())
            .copied()
            .unwrap_or(DEFAULT_RSSI);
        let timestamp = state.clock_us;
        state
            .pending
            .push_back(RawEvent::rssi(handle.as_raw(), timestamp, rssi));
        Ok(())
    }

    fn calibrate(&self, handle: DeviceHandle, current: Option<&[u8]>) -> Result<Vec<u8>, NativeError> {
        let mut state = self.state.lock();
        Self::check(&state, "calibrate", handle)?;
        state.calibrations += 1;
        let mut data = current.map(<[u8]>::to_vec).unwrap_or_default();
        data.push(state.calibrations as u8);
        Ok(data)
    }
}

/// Event source over a [`ScriptedBackend`] queue
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    state: Arc<Mutex<ScriptState>>,
}

impl EventSource for ScriptedSource {
    type Event = RawEvent;

    /// Delivering Connected attaches the handle, delivering Disconnected detaches it
    fn next_event(&mut self) -> Option<RawEvent> {
        let mut state = self.state.lock();
        let event = state.pending.pop_front()?;
        state.clock_us = state.clock_us.max(event.timestamp_us);
        match event.kind {
            EventKind::CONNECTED_CODE => {
                state.live.insert(event.handle);
                state
                    .macs
                    .entry(event.handle)
                    .or_insert_with(|| HardwareId::new(event.handle));
            }
            EventKind::DISCONNECTED_CODE => {
                state.live.remove(&event.handle);
            }
            _ => {}
        }
        Some(event)
    }
}
