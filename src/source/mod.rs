// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state sources and device control.
//!
//! The engine only sees the [`DeviceSource`] and [`DeviceControl`] traits;
//! [`KasaSource`] implements both over the Kasa local protocol.

mod kasa_source;
mod subnet;

pub use kasa_source::{DEFAULT_MAX_CONCURRENT_PROBES, KasaSource};
pub use subnet::{MIN_PREFIX, Subnet};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::DeviceSnapshot;

/// Produces device snapshots.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Sweeps `subnet` and returns a snapshot for every device that answered.
    ///
    /// Devices that do not answer within `timeout` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sweep itself could not be carried out.
    async fn discover_all(
        &self,
        subnet: &Subnet,
        timeout: Duration,
    ) -> Result<Vec<DeviceSnapshot>>;

    /// Reads the current state of the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be reached or its reply is
    /// invalid.
    async fn collect_one(&self, address: &str, timeout: Duration) -> Result<DeviceSnapshot>;
}

/// Applies commands to physical devices.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Switches the relay of the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be reached or rejects the
    /// command.
    async fn set_power(&self, address: &str, on: bool, timeout: Duration) -> Result<()>;
}
