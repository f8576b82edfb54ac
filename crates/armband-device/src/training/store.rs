// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Durable storage for training profiles (save/load)
//!
//! Profiles are keyed by hardware id so they survive reconnects. The file
//! store uses `serde` + bincode, one file per device.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::handle::HardwareId;

/// Persistent profile snapshot (serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBlob {
    pub hardware_id: HardwareId,
    /// Opaque calibration data produced by the native SDK
    pub data: Vec<u8>,
    /// Unix epoch milliseconds of the training run that produced `data`
    pub trained_at: u64,
}

impl ProfileBlob {
    pub fn new(hardware_id: HardwareId, data: Vec<u8>) -> Self {
        let trained_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            hardware_id,
            data,
            trained_at,
        }
    }
}

/// Profile storage error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("profile file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("profile storage unavailable: {0}")]
    Unavailable(String),
}

/// Load/store primitives keyed by hardware id
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when nothing was stored for `hardware_id`
    fn load(&self, hardware_id: HardwareId) -> Result<Option<ProfileBlob>, StoreError>;

    fn store(&self, blob: &ProfileBlob) -> Result<(), StoreError>;
}

/// One bincode file per device under a directory
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/profile_<12 hex digits>.bin`
    pub fn path_for(&self, hardware_id: HardwareId) -> PathBuf {
        self.dir.join(format!("profile_{}.bin", hardware_id.to_hex()))
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, hardware_id: HardwareId) -> Result<Option<ProfileBlob>, StoreError> {
        let path = self.path_for(hardware_id);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let blob: ProfileBlob = bincode::deserialize(&data).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if blob.hardware_id != hardware_id {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("belongs to {}, expected {}", blob.hardware_id, hardware_id),
            });
        }

        debug!("[PROFILES] Loaded {} bytes for {}", blob.data.len(), hardware_id);
        Ok(Some(blob))
    }

    fn store(&self, blob: &ProfileBlob) -> Result<(), StoreError> {
        let encoded = bincode::serialize(blob)
            .map_err(|e| StoreError::Serialization(format!("Serialize failed: {}", e)))?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(blob.hardware_id);
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, encoded)?;
        std::fs::rename(&tmp, &path)?;

        debug!("[PROFILES] Stored profile for {} at {}", blob.hardware_id, path.display());
        Ok(())
    }
}

/// In-process store. Clones share contents, which lets tests simulate a
/// process restart by building a fresh registry over the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<AHashMap<HardwareId, ProfileBlob>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every load/store fail as if the medium were gone
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, hardware_id: HardwareId) -> Result<Option<ProfileBlob>, StoreError> {
        self.check_available()?;
        Ok(self.profiles.read().get(&hardware_id).cloned())
    }

    fn store(&self, blob: &ProfileBlob) -> Result<(), StoreError> {
        self.check_available()?;
        self.profiles.write().insert(blob.hardware_id, blob.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::new(dir.path().join("profiles"));
        let id = HardwareId::new(0xAA_BB_CC_DD_EE_FF);

        assert!(store.load(id).unwrap().is_none());

        let blob = ProfileBlob::new(id, vec![1, 2, 3]);
        store.store(&blob).unwrap();
        assert!(store.path_for(id).ends_with("profile_aabbccddeeff.bin"));

        let loaded = store.load(id).unwrap().unwrap();
        assert_eq!(loaded, blob);
    }

    #[test]
    fn test_file_store_detects_corruption() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::new(dir.path());
        let id = HardwareId::new(7);
        std::fs::write(store.path_for(id), b"not a profile").unwrap();

        assert!(matches!(store.load(id), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_file_store_rejects_foreign_profile() {
        let dir = tempdir().unwrap();
        let store = FileProfileStore::new(dir.path());
        let blob = ProfileBlob::new(HardwareId::new(1), vec![9]);
        let encoded = bincode::serialize(&blob).unwrap();
        std::fs::write(store.path_for(HardwareId::new(2)), encoded).unwrap();

        assert!(matches!(store.load(HardwareId::new(2)), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_memory_store_unavailable() {
        let store = MemoryProfileStore::new();
        let blob = ProfileBlob::new(HardwareId::new(3), vec![]);
        store.store(&blob).unwrap();
        assert_eq!(store.len(), 1);

        let view = store.clone();
        view.set_unavailable(true);
        assert!(matches!(store.load(HardwareId::new(3)), Err(StoreError::Unavailable(_))));
        assert!(store.store(&blob).is_err());
    }
}
