// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Training profile lifecycle
//!
//! A session's profile is created the first time it is asked for and then
//! reused for the rest of the session's life. Only `train` changes its data
//! and only `save` writes it out. Every operation requires a connected
//! session.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use armband_config::ProfilesConfig;

use crate::device::Device;
use crate::error::{DeviceError, Result};
use crate::handle::HardwareId;
use crate::training::store::{FileProfileStore, ProfileBlob, ProfileStore};

/// Calibration profile held by one session
#[derive(Debug)]
pub struct TrainingProfile {
    hardware_id: HardwareId,
    blob: Mutex<Option<ProfileBlob>>,
}

impl TrainingProfile {
    fn new(hardware_id: HardwareId) -> Self {
        Self {
            hardware_id,
            blob: Mutex::new(None),
        }
    }

    pub fn hardware_id(&self) -> HardwareId {
        self.hardware_id
    }

    /// Whether the profile holds calibration data (trained or loaded)
    pub fn is_loaded(&self) -> bool {
        self.blob.lock().is_some()
    }

    /// Copy of the current calibration data
    pub fn snapshot(&self) -> Option<ProfileBlob> {
        self.blob.lock().clone()
    }

    fn install(&self, blob: ProfileBlob) {
        *self.blob.lock() = Some(blob);
    }

    fn data(&self) -> Option<Vec<u8>> {
        self.blob.lock().as_ref().map(|blob| blob.data.clone())
    }
}

/// Loads, trains and persists per-device training profiles
pub struct TrainingProfiles {
    store: Arc<dyn ProfileStore>,
}

impl TrainingProfiles {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// File-backed manager rooted at `profiles.storage_dir`
    pub fn from_config(config: &ProfilesConfig) -> Self {
        Self::new(Arc::new(FileProfileStore::new(config.storage_dir.clone())))
    }

    /// The session's profile, created on first call and memoized afterwards
    pub fn get_or_create_profile(&self, device: &Device) -> Result<Arc<TrainingProfile>> {
        device.live_handle()?;
        Ok(Arc::clone(device.profile_cell().get_or_init(|| {
            Arc::new(TrainingProfile::new(device.hardware_id()))
        })))
    }

    /// Run native calibration against the current profile and mark the session trained
    pub fn train(&self, device: &Device) -> Result<()> {
        let handle = device.live_handle()?;
        let profile = self.get_or_create_profile(device)?;
        let current = profile.data();

        let data = device.backend().calibrate(handle, current.as_deref())?;
        profile.install(ProfileBlob::new(device.hardware_id(), data));
        device.set_trained(true);

        info!("[PROFILES] Trained profile for {}", device.hardware_id());
        Ok(())
    }

    /// Persist the current profile under the device's hardware id
    pub fn save(&self, device: &Device) -> Result<()> {
        let profile = self.get_or_create_profile(device)?;
        let blob = profile
            .snapshot()
            .ok_or(DeviceError::ProfileEmpty(device.hardware_id()))?;

        self.store.store(&blob).map_err(|e| {
            warn!("[PROFILES] Failed to save profile for {}: {}", device.hardware_id(), e);
            e
        })?;
        info!("[PROFILES] Saved profile for {}", device.hardware_id());
        Ok(())
    }

    /// Hydrate trained state from storage.
    ///
    /// Returns `Ok(false)` when nothing is stored for the device; the session
    /// is left untouched in that case and on error.
    pub fn load(&self, device: &Device) -> Result<bool> {
        device.live_handle()?;
        let Some(blob) = self.store.load(device.hardware_id())? else {
            return Ok(false);
        };

        let profile = self.get_or_create_profile(device)?;
        profile.install(blob);
        device.set_trained(true);
        info!("[PROFILES] Restored training profile for {}", device.hardware_id());
        Ok(true)
    }
}

impl fmt::Debug for TrainingProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingProfiles").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::DeviceHandle;
    use crate::scripted::ScriptedBackend;
    use crate::training::store::MemoryProfileStore;

    const MAC: u64 = 0x00_11_22_33_44_55;

    fn device(backend: &ScriptedBackend, raw: u64) -> Arc<Device> {
        backend.attach(raw, MAC);
        Device::new(DeviceHandle::from_raw(raw).unwrap(), backend.shared())
    }

    #[test]
    fn test_profile_is_memoized() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));

        let first = profiles.get_or_create_profile(&device).unwrap();
        let second = profiles.get_or_create_profile(&device).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.is_loaded());
    }

    #[test]
    fn test_train_save_reload() {
        let backend = ScriptedBackend::new();
        let store = MemoryProfileStore::new();
        let profiles = TrainingProfiles::new(Arc::new(store.clone()));

        let device = device(&backend, 1);
        profiles.train(&device).unwrap();
        assert!(device.is_trained());
        profiles.save(&device).unwrap();

        // Same armband under a new handle, as after a restart
        let restarted = TrainingProfiles::new(Arc::new(store));
        let again = self::device(&backend, 2);
        assert!(!again.is_trained());
        assert!(restarted.load(&again).unwrap());
        assert!(again.is_trained());
        assert_eq!(
            restarted.get_or_create_profile(&again).unwrap().snapshot().unwrap().data,
            vec![1]
        );
    }

    #[test]
    fn test_load_without_stored_profile() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));

        assert!(!profiles.load(&device).unwrap());
        assert!(!device.is_trained());
    }

    #[test]
    fn test_store_failure_leaves_trained_unchanged() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let store = MemoryProfileStore::new();
        let profiles = TrainingProfiles::new(Arc::new(store.clone()));

        store.set_unavailable(true);
        assert!(matches!(profiles.load(&device), Err(DeviceError::Store(_))));
        assert!(!device.is_trained());

        profiles.train(&device).unwrap();
        assert!(matches!(profiles.save(&device), Err(DeviceError::Store(_))));
        assert!(device.is_trained());
    }

    #[test]
    fn test_save_untrained_profile_is_rejected() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));
        assert!(matches!(profiles.save(&device), Err(DeviceError::ProfileEmpty(_))));
    }

    #[test]
    fn test_profile_operations_on_disconnected_session() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));
        device.mark_disconnected();

        assert!(matches!(profiles.get_or_create_profile(&device), Err(DeviceError::Disconnected(_))));
        assert!(matches!(profiles.train(&device), Err(DeviceError::Disconnected(_))));
        assert!(matches!(profiles.load(&device), Err(DeviceError::Disconnected(_))));
        assert_eq!(backend.calibration_count(), 0);
    }

    #[test]
    fn test_failed_calibration_keeps_untrained() {
        let backend = ScriptedBackend::new();
        let device = device(&backend, 1);
        let profiles = TrainingProfiles::new(Arc::new(MemoryProfileStore::new()));
        backend.fail_call("calibrate");

        assert!(matches!(profiles.train(&device), Err(DeviceError::Native(_))));
        assert!(!device.is_trained());
    }
}
