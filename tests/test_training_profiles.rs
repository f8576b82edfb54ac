//! Training profile lifecycle across simulated process restarts

use armband::config::ArmbandConfig;
use armband::device::{
    DeviceError, DeviceRegistry, EventDispatcher, FileProfileStore, HardwareId, MemoryProfileStore,
    ProfileStore, RawEvent, ScriptedBackend, TrainingProfiles,
};
use std::sync::Arc;
use tempfile::tempdir;

const MAC: u64 = 0x00_1B_44_11_3A_B7;

/// One "process": a fresh backend, registry and dispatcher over `config`
fn boot(config: &ArmbandConfig, handle: u64) -> (ScriptedBackend, EventDispatcher) {
    let backend = ScriptedBackend::new();
    backend.attach(handle, MAC);
    let dispatcher =
        EventDispatcher::from_config(Arc::new(DeviceRegistry::new(backend.shared())), config);
    backend.push(RawEvent::connected(handle, 1));
    dispatcher.drain(&mut backend.source()).unwrap();
    (backend, dispatcher)
}

#[test]
fn profile_is_created_once_per_session() {
    let backend = ScriptedBackend::new();
    backend.attach(1, MAC);
    let registry = DeviceRegistry::new(backend.shared());
    let device = registry.resolve(1).unwrap();
    let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));

    let first = profiles.get_or_create_profile(&device).unwrap();
    let second = profiles.get_or_create_profile(&device).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.hardware_id(), HardwareId::new(MAC));
    assert!(!device.is_trained());
}

#[test]
fn trained_profile_survives_restart_on_disk() {
    let dir = tempdir().unwrap();
    let mut config = ArmbandConfig::default();
    config.profiles.storage_dir = dir.path().join("profiles");
    config.profiles.load_on_connect = true;

    // First run: train and save
    {
        let (_backend, dispatcher) = boot(&config, 7);
        let device = dispatcher.registry().get(7).unwrap();
        assert!(!device.is_trained());

        let profiles = dispatcher.profiles().unwrap();
        profiles.train(&device).unwrap();
        profiles.save(&device).unwrap();
        assert!(device.is_trained());
    }

    let store = FileProfileStore::new(&config.profiles.storage_dir);
    assert!(store.path_for(HardwareId::new(MAC)).exists());

    // Second run, different handle value for the same armband
    let (_backend, dispatcher) = boot(&config, 12);
    let device = dispatcher.registry().get(12).unwrap();
    assert!(device.is_trained());

    let profile = dispatcher
        .profiles()
        .unwrap()
        .get_or_create_profile(&device)
        .unwrap();
    assert_eq!(profile.snapshot().unwrap().data, vec![1]);
}

#[test]
fn load_on_connect_can_be_disabled() {
    let dir = tempdir().unwrap();
    let mut config = ArmbandConfig::default();
    config.profiles.storage_dir = dir.path().to_path_buf();

    {
        let (_backend, dispatcher) = boot(&config, 3);
        let device = dispatcher.registry().get(3).unwrap();
        let profiles = dispatcher.profiles().unwrap();
        profiles.train(&device).unwrap();
        profiles.save(&device).unwrap();
    }

    config.profiles.load_on_connect = false;
    let (_backend, dispatcher) = boot(&config, 3);
    let device = dispatcher.registry().get(3).unwrap();
    assert!(!device.is_trained());

    // Explicit load still works
    assert!(dispatcher.profiles().unwrap().load(&device).unwrap());
    assert!(device.is_trained());
}

#[test]
fn retraining_builds_on_current_profile() {
    let backend = ScriptedBackend::new();
    backend.attach(1, MAC);
    let registry = DeviceRegistry::new(backend.shared());
    let device = registry.resolve(1).unwrap();
    let store = MemoryProfileStore::new();
    let profiles = TrainingProfiles::new(Arc::new(store.clone()));

    profiles.train(&device).unwrap();
    profiles.train(&device).unwrap();
    profiles.save(&device).unwrap();

    let saved = store.load(HardwareId::new(MAC)).unwrap().unwrap();
    assert_eq!(saved.data, vec![1, 2]);
    assert_eq!(backend.calibration_count(), 2);
}

#[test]
fn storage_failure_is_reported_and_state_kept() {
    let backend = ScriptedBackend::new();
    backend.attach(1, MAC);
    let registry = DeviceRegistry::new(backend.shared());
    let device = registry.resolve(1).unwrap();
    let store = MemoryProfileStore::new();
    let profiles = TrainingProfiles::new(Arc::new(store.clone()));

    profiles.train(&device).unwrap();
    store.set_unavailable(true);

    let err = profiles.save(&device).unwrap_err();
    assert!(matches!(err, DeviceError::Store(_)));
    assert!(!err.is_contract_violation());
    assert!(device.is_trained());

    store.set_unavailable(false);
    profiles.save(&device).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn saving_an_untrained_profile_is_rejected() {
    let backend = ScriptedBackend::new();
    backend.attach(1, MAC);
    let registry = DeviceRegistry::new(backend.shared());
    let device = registry.resolve(1).unwrap();
    let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));

    let err = profiles.save(&device).unwrap_err();
    assert!(matches!(err, DeviceError::ProfileEmpty(_)));
    assert!(err.is_contract_violation());
}
