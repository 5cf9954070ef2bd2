// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command listeners.
//!
//! A listener subscribes to commands addressed to one device, applies them
//! to the hardware, and hands the refreshed snapshot back to the engine
//! through a [`StateChangedCallback`] so destinations see the change without
//! waiting for the next poll.

mod home_assistant;

pub use home_assistant::{HomeAssistantListener, HomeAssistantListenerOptions};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::DeviceSnapshot;

/// Re-entry point for externally triggered state changes.
#[async_trait]
pub trait StateChangedCallback: Send + Sync {
    /// Called with the snapshot read back after a command was applied.
    async fn state_changed(&self, snapshot: DeviceSnapshot);
}

/// A source of inbound commands for individual devices.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Starts listening for commands to `snapshot`'s device.
    ///
    /// Calling this again for an already known device does not subscribe
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription could not be made; a later call
    /// for the same device tries again.
    async fn listen(
        &self,
        snapshot: &DeviceSnapshot,
        callback: Arc<dyn StateChangedCallback>,
    ) -> Result<()>;
}
