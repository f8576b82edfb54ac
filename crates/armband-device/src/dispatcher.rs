// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event dispatcher
//!
//! Pulls raw records from the native source in order and routes each one to
//! its session:
//!
//! 1. resolve the handle (creating the session on first sight)
//! 2. decode the kind-specific payload
//! 3. hand the record to the session, which fans out to subscribers
//!
//! Subscriber callbacks run synchronously on the dispatching thread, so a slow
//! callback stalls every device behind it. A callback must not dispatch a
//! record for its own session: that call fails with `ReentrantDispatch`.
//!
//! Records that arrive for a handle after its Disconnected (a late RSSI reply,
//! say) are dropped. Only a new Connected brings the handle value back.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use armband_config::{ArmbandConfig, DispatchConfig};

use crate::device::Device;
use crate::error::Result;
use crate::event::{ConnectionState, DeviceRecord, RecordPayload};
use crate::native::{EventKind, EventSource, NativeEvent};
use crate::registry::{DeviceRegistry, Resolved};
use crate::training::TrainingProfiles;

/// What happened to one raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and handed to the session
    Delivered,
    /// Unrecognised event kind, dropped
    Ignored,
    /// Handle already disconnected and not reconnected, dropped
    Stale,
}

type SessionHook = Box<dyn Fn(&Arc<Device>) + Send + Sync>;

/// Routes native records to device sessions
pub struct EventDispatcher {
    registry: Arc<DeviceRegistry>,
    profiles: Option<Arc<TrainingProfiles>>,
    session_hooks: Vec<SessionHook>,
    load_on_connect: bool,
    /// Zero means unbounded
    max_events_per_drain: usize,
}

impl EventDispatcher {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            profiles: None,
            session_hooks: Vec::new(),
            load_on_connect: false,
            max_events_per_drain: 0,
        }
    }

    /// Dispatcher with file-backed profiles and limits taken from `config`
    pub fn from_config(registry: Arc<DeviceRegistry>, config: &ArmbandConfig) -> Self {
        Self::new(registry)
            .with_profiles(
                Arc::new(TrainingProfiles::from_config(&config.profiles)),
                config.profiles.load_on_connect,
            )
            .with_config(&config.dispatch)
    }

    /// Attach a profile manager; with `load_on_connect` every new session is
    /// hydrated from storage before its first record is delivered
    pub fn with_profiles(mut self, profiles: Arc<TrainingProfiles>, load_on_connect: bool) -> Self {
        self.profiles = Some(profiles);
        self.load_on_connect = load_on_connect;
        self
    }

    /// Run `hook` for every new session before its first record is delivered,
    /// after load-on-connect. Lets callers subscribe in time for Connected.
    pub fn with_session_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<Device>) + Send + Sync + 'static,
    {
        self.session_hooks.push(Box::new(hook));
        self
    }

    pub fn with_config(mut self, config: &DispatchConfig) -> Self {
        self.max_events_per_drain = config.max_events_per_drain;
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn profiles(&self) -> Option<&Arc<TrainingProfiles>> {
        self.profiles.as_ref()
    }

    /// Route one raw record.
    ///
    /// The handle is resolved before the kind is examined, so a record of an
    /// unknown kind still registers its session. After a Disconnected record
    /// has been delivered the handle is invalidated, even if a subscriber
    /// failed, and later records for it are `Stale` until it reconnects.
    pub fn dispatch<E>(&self, event: &E) -> Result<DispatchOutcome>
    where
        E: NativeEvent + ?Sized,
    {
        let reconnect = event.kind_code() == EventKind::CONNECTED_CODE;
        let (device, created) = match self.registry.resolve_tracked(event.handle(), reconnect)? {
            Resolved::Existing(device) => (device, false),
            Resolved::Created(device) => (device, true),
            Resolved::Retired(handle) => {
                trace!(
                    "[DISPATCH] Dropping event kind {} for disconnected handle {}",
                    event.kind_code(),
                    handle
                );
                return Ok(DispatchOutcome::Stale);
            }
        };
        if created {
            if event.kind_code() != EventKind::DISCONNECTED_CODE {
                self.load_profile_on_connect(&device);
            }
            for hook in &self.session_hooks {
                hook(&device);
            }
        }

        let Some(record) = DeviceRecord::decode(&device, event) else {
            trace!(
                "[DISPATCH] Ignoring event kind {} for {}",
                event.kind_code(),
                device.hardware_id()
            );
            return Ok(DispatchOutcome::Ignored);
        };

        let disconnect = matches!(
            record.payload(),
            RecordPayload::Connection(ConnectionState::Disconnected)
        );

        let delivered = device.handle_record(&record);

        if disconnect {
            if let Some(handle) = device.handle() {
                self.registry.invalidate(handle);
            }
        }

        delivered.map(|()| DispatchOutcome::Delivered)
    }

    /// Dispatch records until the source is exhausted or the per-drain limit
    /// is reached. Returns how many records were pulled; stops at the first
    /// error.
    pub fn drain<S>(&self, source: &mut S) -> Result<usize>
    where
        S: EventSource + ?Sized,
    {
        let mut count = 0usize;
        while self.max_events_per_drain == 0 || count < self.max_events_per_drain {
            let Some(event) = source.next_event() else {
                break;
            };
            count += 1;
            self.dispatch(&event)?;
        }
        if count > 0 {
            debug!("[DISPATCH] Drained {} events", count);
        }
        Ok(count)
    }

    fn load_profile_on_connect(&self, device: &Device) {
        if !self.load_on_connect {
            return;
        }
        let Some(profiles) = &self.profiles else {
            return;
        };
        // The session stays usable untrained; the caller can retry with `load`
        if let Err(e) = profiles.load(device) {
            warn!(
                "[DISPATCH] Could not restore training profile for {}: {}",
                device.hardware_id(),
                e
            );
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("session_hooks", &self.session_hooks.len())
            .field("load_on_connect", &self.load_on_connect)
            .field("max_events_per_drain", &self.max_events_per_drain)
            .finish()
    }
}
