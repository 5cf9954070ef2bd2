// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish destinations.
//!
//! A destination turns a changed [`DeviceSnapshot`] into bus documents. The
//! engine calls every configured destination in order and logs failures
//! without stopping; destinations never retry on their own.

mod home_assistant;
mod standard;

pub use home_assistant::HomeAssistantDestination;
pub use standard::StandardDestination;

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::DeviceSnapshot;

/// A sink that publishes snapshots to the bus.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Publishes one changed snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first encoding or transport error; later documents for
    /// the same snapshot are not attempted.
    async fn publish(&self, snapshot: &DeviceSnapshot) -> Result<()>;
}
