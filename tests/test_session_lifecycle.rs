//! Registry identity, disconnect handling and error propagation

use armband::device::{
    Channel, DeviceError, DeviceRegistry, DispatchOutcome, EventDispatcher, Pose, RawEvent,
    ScriptedBackend, VibrationType,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn setup() -> (ScriptedBackend, EventDispatcher) {
    let backend = ScriptedBackend::new();
    let dispatcher = EventDispatcher::new(Arc::new(DeviceRegistry::new(backend.shared())));
    (backend, dispatcher)
}

#[test]
fn resolving_twice_returns_the_same_session() {
    let (backend, dispatcher) = setup();
    backend.attach(3, 0xC0_FF_EE_00_00_01);
    let registry = dispatcher.registry();

    let first = registry.resolve(3).unwrap();
    let second = registry.resolve(3).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.hardware_id().to_string(), "c0:ff:ee:00:00:01");
}

#[test]
fn zero_handle_is_a_contract_violation() {
    let (_backend, dispatcher) = setup();
    let err = dispatcher.registry().resolve(0).unwrap_err();
    assert!(matches!(err, DeviceError::NullHandle));
    assert!(err.is_contract_violation());
}

#[test]
fn session_is_inert_after_disconnect() {
    let (backend, dispatcher) = setup();
    backend.extend([RawEvent::connected(9, 1), RawEvent::pose(9, 2, Pose::Fist)]);
    dispatcher.drain(&mut backend.source()).unwrap();
    let device = dispatcher.registry().get(9).unwrap();

    backend.push(RawEvent::disconnected(9, 3));
    dispatcher.drain(&mut backend.source()).unwrap();

    assert!(!device.is_connected());
    assert!(device.handle().is_none());
    // Reads still work
    assert_eq!(device.pose(), Pose::Fist);

    let err = device.vibrate(VibrationType::Short).unwrap_err();
    assert!(matches!(err, DeviceError::Disconnected(_)));
    assert!(err.is_contract_violation());
    assert!(matches!(device.request_rssi(), Err(DeviceError::Disconnected(_))));
    assert!(backend.vibrations().is_empty());
}

#[test]
fn reconnect_on_recycled_handle_gets_fresh_session() {
    let (backend, dispatcher) = setup();
    backend.extend([
        RawEvent::connected(4, 1),
        RawEvent::pose(4, 2, Pose::WaveIn),
        RawEvent::disconnected(4, 3),
    ]);
    dispatcher.drain(&mut backend.source()).unwrap();
    assert!(dispatcher.registry().is_empty());

    backend.push(RawEvent::connected(4, 10));
    dispatcher.drain(&mut backend.source()).unwrap();

    let fresh = dispatcher.registry().get(4).unwrap();
    assert!(fresh.is_connected());
    assert_eq!(fresh.pose(), Pose::Unknown);
}

#[test]
fn subscriber_failure_stops_fan_out_and_reaches_caller() {
    let (backend, dispatcher) = setup();
    let device = dispatcher.registry().resolve(5).unwrap();
    backend.attach(5, 5);

    let later = Arc::new(Mutex::new(0));
    device.on_pose_changed(|_| Err("overlay crashed".into()));
    let counter = Arc::clone(&later);
    device.on_pose_changed(move |_| {
        *counter.lock() += 1;
        Ok(())
    });

    let err = dispatcher
        .dispatch(&RawEvent::pose(5, 1, Pose::FingersSpread))
        .unwrap_err();

    match err {
        DeviceError::Subscriber { channel, source } => {
            assert_eq!(channel, Channel::PoseChanged);
            assert_eq!(source.to_string(), "overlay crashed");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(*later.lock(), 0);
    assert_eq!(device.pose(), Pose::FingersSpread);
}

#[test]
fn drain_stops_at_first_error() {
    let (backend, dispatcher) = setup();
    backend.extend([
        RawEvent::connected(2, 1),
        RawEvent::connected(0, 2),
        RawEvent::pose(2, 3, Pose::Fist),
    ]);

    let mut source = backend.source();
    assert!(matches!(dispatcher.drain(&mut source), Err(DeviceError::NullHandle)));
    assert_eq!(backend.pending_len(), 1);

    assert_eq!(dispatcher.drain(&mut source).unwrap(), 1);
    assert_eq!(dispatcher.registry().get(2).unwrap().pose(), Pose::Fist);
}

#[test]
fn fist_reaction_vibrates_from_inside_a_callback() {
    let (backend, dispatcher) = setup();
    let dispatcher = dispatcher.with_session_hook(|device| {
        device.on_pose_changed(|event| {
            if *event.data() == Pose::Fist {
                event.device().vibrate(VibrationType::Medium)?;
            }
            Ok(())
        });
    });

    backend.extend([
        RawEvent::connected(1, 1),
        RawEvent::pose(1, 2, Pose::Fist),
        RawEvent::pose(1, 3, Pose::Fist),
        RawEvent::pose(1, 4, Pose::Rest),
        RawEvent::pose(1, 5, Pose::Fist),
    ]);
    dispatcher.drain(&mut backend.source()).unwrap();

    let vibrations = backend.vibrations();
    assert_eq!(vibrations.len(), 2);
    assert!(vibrations.iter().all(|(_, v)| *v == VibrationType::Medium));
}

#[test]
fn unknown_kind_creates_session_without_notifications() {
    let (_backend, dispatcher) = setup();
    let outcome = dispatcher.dispatch(&RawEvent::new(8, 42, 1)).unwrap();
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(dispatcher.registry().len(), 1);
}

#[test]
fn late_reply_after_disconnect_does_not_revive_the_handle() {
    let (backend, dispatcher) = setup();
    let dispatcher = dispatcher.with_session_hook(|device| {
        device.on_connected(|event| {
            event.device().request_rssi()?;
            Ok(())
        });
    });

    backend.extend([
        RawEvent::connected(6, 1),
        RawEvent::pose(6, 2, Pose::Fist),
        RawEvent::disconnected(6, 3),
    ]);
    assert_eq!(dispatcher.drain(&mut backend.source()).unwrap(), 4);

    assert!(dispatcher.registry().is_empty());
    assert!(dispatcher.registry().live_devices().is_empty());
    assert_eq!(
        dispatcher.dispatch(&RawEvent::rssi(6, 4, -48)).unwrap(),
        DispatchOutcome::Stale
    );
    assert!(dispatcher.registry().get(6).is_none());
}

