// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device fan-out to destinations and listeners.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::destination::Destination;
use crate::listener::{Listener, StateChangedCallback};
use crate::snapshot::DeviceSnapshot;

use super::DeviceTable;

pub(crate) struct Dispatcher {
    table: DeviceTable,
    destinations: Vec<Arc<dyn Destination>>,
    listeners: Vec<Arc<dyn Listener>>,
    callback: Arc<dyn StateChangedCallback>,
}

impl Dispatcher {
    pub(crate) fn new(
        destinations: Vec<Arc<dyn Destination>>,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            table: DeviceTable::new(),
            destinations,
            listeners,
            callback: Arc::new(DispatchCallback(weak.clone())),
        })
    }

    pub(crate) fn table(&self) -> &DeviceTable {
        &self.table
    }

    /// Publishes `snapshot` through every destination, then registers it
    /// with every listener. Failures are logged and skipped.
    pub(crate) async fn dispatch(&self, snapshot: &DeviceSnapshot) {
        for destination in &self.destinations {
            if let Err(e) = destination.publish(snapshot).await {
                tracing::error!(
                    destination = destination.name(),
                    device = %snapshot.id,
                    error = %e,
                    "Destination failed to publish"
                );
            }
        }

        for listener in &self.listeners {
            if let Err(e) = listener.listen(snapshot, Arc::clone(&self.callback)).await {
                tracing::error!(
                    listener = listener.name(),
                    device = %snapshot.id,
                    error = %e,
                    "Listener failed to subscribe"
                );
            }
        }
    }
}

/// Routes listener refreshes back into the dispatch path.
struct DispatchCallback(Weak<Dispatcher>);

#[async_trait]
impl StateChangedCallback for DispatchCallback {
    async fn state_changed(&self, snapshot: DeviceSnapshot) {
        let Some(dispatcher) = self.0.upgrade() else {
            tracing::debug!(device = %snapshot.id, "Bridge dropped, ignoring refresh");
            return;
        };

        tracing::debug!(device = %snapshot.id, "Dispatching refreshed state");
        dispatcher.table.record(snapshot.clone());
        dispatcher.dispatch(&snapshot).await;
    }
}
