// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-device training (calibration) profiles

mod profile;
mod store;

pub use profile::{TrainingProfile, TrainingProfiles};
pub use store::{FileProfileStore, MemoryProfileStore, ProfileBlob, ProfileStore, StoreError};
