// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device handle registry
//!
//! Maps live native handles to their sessions. A handle resolves to the same
//! `Arc<Device>` until the dispatcher invalidates it on Disconnected. The
//! handle value is then retired: records still queued behind the Disconnected
//! are dropped, and only a new Connected on the recycled value opens a fresh
//! session.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{DeviceError, Result};
use crate::handle::DeviceHandle;
use crate::native::NativeBackend;

/// Outcome of resolving a raw handle
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Session already registered
    Existing(Arc<Device>),
    /// Session created and registered by this call
    Created(Arc<Device>),
    /// Handle was invalidated and has not reconnected since
    Retired(DeviceHandle),
}

#[derive(Debug, Default)]
struct Sessions {
    live: AHashMap<DeviceHandle, Arc<Device>>,
    retired: AHashSet<DeviceHandle>,
}

/// Registry of live device sessions keyed by native handle
pub struct DeviceRegistry {
    backend: Arc<dyn NativeBackend>,
    sessions: RwLock<Sessions>,
}

impl DeviceRegistry {
    pub fn new(backend: Arc<dyn NativeBackend>) -> Self {
        Self {
            backend,
            sessions: RwLock::new(Sessions::default()),
        }
    }

    /// Session for `raw_handle`, created and registered on first sight.
    ///
    /// An explicit resolve counts as a reconnect, so a retired handle value
    /// gets a fresh session.
    pub fn resolve(&self, raw_handle: u64) -> Result<Arc<Device>> {
        match self.resolve_tracked(raw_handle, true)? {
            Resolved::Existing(device) | Resolved::Created(device) => Ok(device),
            Resolved::Retired(handle) => Err(DeviceError::InvalidHandle(handle)),
        }
    }

    /// Like [`resolve`](Self::resolve), also reporting whether the session was
    /// created by this call. A retired handle is only revived when
    /// `reconnect` is set; otherwise it stays retired.
    pub fn resolve_tracked(&self, raw_handle: u64, reconnect: bool) -> Result<Resolved> {
        let handle = DeviceHandle::from_raw(raw_handle).ok_or(DeviceError::NullHandle)?;

        {
            let sessions = self.sessions.read();
            if let Some(device) = sessions.live.get(&handle) {
                return Ok(Resolved::Existing(Arc::clone(device)));
            }
            if !reconnect && sessions.retired.contains(&handle) {
                return Ok(Resolved::Retired(handle));
            }
        }

        // Re-check under the write lock: another thread may have won the race
        let mut sessions = self.sessions.write();
        if let Some(device) = sessions.live.get(&handle) {
            return Ok(Resolved::Existing(Arc::clone(device)));
        }
        if sessions.retired.contains(&handle) {
            if !reconnect {
                return Ok(Resolved::Retired(handle));
            }
            sessions.retired.remove(&handle);
        }

        let device = Device::new(handle, Arc::clone(&self.backend));
        sessions.live.insert(handle, Arc::clone(&device));
        info!(
            "[REGISTRY] New session for {} on handle {} (live sessions: {})",
            device.hardware_id(),
            handle,
            sessions.live.len()
        );
        Ok(Resolved::Created(device))
    }

    /// Lookup without creation
    pub fn get(&self, raw_handle: u64) -> Option<Arc<Device>> {
        let handle = DeviceHandle::from_raw(raw_handle)?;
        self.sessions.read().live.get(&handle).cloned()
    }

    /// Remove the session for `handle`, clear its native handle and retire
    /// the handle value until it reconnects.
    ///
    /// Callers still holding the `Arc` keep a readable but inert session.
    pub fn invalidate(&self, handle: DeviceHandle) -> Option<Arc<Device>> {
        let removed = {
            let mut sessions = self.sessions.write();
            sessions.retired.insert(handle);
            sessions.live.remove(&handle)
        };
        match &removed {
            Some(device) => device.mark_disconnected(),
            None => debug!("[REGISTRY] Invalidate for unknown handle {}", handle),
        }
        removed
    }

    /// Whether `handle` was invalidated and has not reconnected since
    pub fn is_retired(&self, handle: DeviceHandle) -> bool {
        self.sessions.read().retired.contains(&handle)
    }

    /// Snapshot of the currently registered sessions
    pub fn live_devices(&self) -> Vec<Arc<Device>> {
        self.sessions.read().live.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().live.is_empty()
    }

    pub fn backend(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("live_sessions", &self.len())
            .finish()
    }
}
