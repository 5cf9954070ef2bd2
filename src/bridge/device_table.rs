// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last known snapshot per device.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::snapshot::{DeviceId, DeviceSnapshot};

/// Mapping from device id to the last snapshot observed for it.
///
/// Entries are added on first sighting and overwritten afterwards, never
/// removed. Every operation takes the lock once, so concurrent writers for
/// the same id never lose or tear an update: the last writer wins.
#[derive(Debug, Default)]
pub struct DeviceTable {
    devices: RwLock<HashMap<DeviceId, DeviceSnapshot>>,
}

impl DeviceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `snapshot` and reports whether it differs from the previous
    /// entry for its id.
    ///
    /// Comparison and overwrite happen under one write lock.
    pub fn observe(&self, snapshot: &DeviceSnapshot) -> bool {
        let mut devices = self.devices.write();
        let changed = snapshot.differs_from(devices.get(&snapshot.id));
        if changed {
            devices.insert(snapshot.id.clone(), snapshot.clone());
        }
        changed
    }

    /// Stores `snapshot` unconditionally.
    pub fn record(&self, snapshot: DeviceSnapshot) {
        self.devices.write().insert(snapshot.id.clone(), snapshot);
    }

    /// Returns the stored snapshot for `id`.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<DeviceSnapshot> {
        self.devices.read().get(id).cloned()
    }

    /// Returns every stored snapshot, ordered by id.
    #[must_use]
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        let mut snapshots: Vec<_> = self.devices.read().values().cloned().collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    /// Returns the number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns `true` if no device has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
