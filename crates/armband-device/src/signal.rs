// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ordered observer lists, one per subscription point.
//!
//! Callbacks run synchronously on the dispatching thread, in registration
//! order. A callback returning an error stops delivery of that value to the
//! remaining callbacks and the error is handed back to the emitter.
//!
//! The listener list is snapshotted before callbacks run, so a callback may
//! connect or disconnect listeners on the same signal; the change applies to
//! the next emitted value.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error type subscriber callbacks may return
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type subscriber callbacks return
pub type SubscriberResult = Result<(), SubscriberError>;

type Listener<T> = Arc<dyn Fn(&T) -> SubscriberResult + Send + Sync>;

/// Identifies one connected callback within a [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// The subscription points a device session exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Connected,
    Disconnected,
    PoseChanged,
    OrientationData,
    AccelerometerData,
    GyroscopeData,
    SignalStrength,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Connected => "connected",
            Channel::Disconnected => "disconnected",
            Channel::PoseChanged => "pose-changed",
            Channel::OrientationData => "orientation",
            Channel::AccelerometerData => "accelerometer",
            Channel::GyroscopeData => "gyroscope",
            Channel::SignalStrength => "signal-strength",
        };
        write!(f, "{}", name)
    }
}

/// Handle returned by the device `on_*` methods, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub channel: Channel,
    pub id: SubscriptionId,
}

/// Observer list for values of type `T`
pub struct Signal<T> {
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Append a callback. It runs after every callback connected before it.
    pub fn connect<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&T) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(f)));
        id
    }

    /// Remove a callback. Returns false if it was not connected.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every connected callback with `value`, stopping at the first failure
    pub fn emit(&self, value: &T) -> SubscriberResult {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(value)?;
        }
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn disconnect_all(&self) {
        self.listeners.lock().clear();
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_registration_order() {
        let signal: Signal<u32> = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            signal.connect(move |value| {
                seen.lock().push(format!("{}{}", tag, value));
                Ok(())
            });
        }

        signal.emit(&7).unwrap();
        assert_eq!(*seen.lock(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_failure_stops_fan_out() {
        let signal: Signal<u32> = Signal::new();
        let calls = Arc::new(AtomicU64::new(0));

        let first = Arc::clone(&calls);
        signal.connect(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Err("boom".into())
        });
        let second = Arc::clone(&calls);
        signal.connect(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = signal.emit(&1).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect() {
        let signal: Signal<u32> = Signal::new();
        let id = signal.connect(|_| Ok(()));
        assert_eq!(signal.listener_count(), 1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_connect_from_inside_callback() {
        let signal: Arc<Signal<u32>> = Arc::new(Signal::new());
        let inner = Arc::clone(&signal);
        signal.connect(move |_| {
            inner.connect(|_| Ok(()));
            Ok(())
        });

        signal.emit(&0).unwrap();
        assert_eq!(signal.listener_count(), 2);
    }

    #[test]
    fn test_disconnect_all() {
        let signal: Signal<u32> = Signal::new();
        signal.connect(|_| Ok(()));
        signal.connect(|_| Err("never called".into()));
        signal.disconnect_all();
        assert_eq!(signal.listener_count(), 0);
        signal.emit(&1).unwrap();
    }
}

