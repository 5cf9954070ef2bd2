// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant switch command listener.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::protocol::{BusMessage, MessageBus, MessageHandler, QoS};
use crate::snapshot::{DeviceId, DeviceSnapshot};
use crate::source::{DeviceControl, DeviceSource};
use crate::topics::{self, LEAF_SET, PAYLOAD_OFF, PAYLOAD_ON};

use super::{Listener, StateChangedCallback};

/// Settings for [`HomeAssistantListener`].
#[derive(Debug, Clone)]
pub struct HomeAssistantListenerOptions {
    /// Discovery prefix the command topics live under.
    pub discovery_prefix: String,
    /// Timeout for the control call and the read-back.
    pub timeout: Duration,
}

impl Default for HomeAssistantListenerOptions {
    fn default() -> Self {
        Self {
            discovery_prefix: topics::DEFAULT_DISCOVERY_PREFIX.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Listens on `<prefix>/switch/<id>/set` for `ON`/`OFF` commands.
///
/// On a valid command the relay is switched, the device is read back once,
/// and the fresh snapshot is passed to the callback registered with
/// [`Listener::listen`]. Malformed topics, unknown devices and other
/// payloads are logged and dropped.
#[derive(Clone)]
pub struct HomeAssistantListener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    bus: Arc<dyn MessageBus>,
    source: Arc<dyn DeviceSource>,
    control: Arc<dyn DeviceControl>,
    options: HomeAssistantListenerOptions,
    /// Subscribed devices, holding their latest known snapshot.
    devices: RwLock<HashMap<DeviceId, DeviceSnapshot>>,
}

impl HomeAssistantListener {
    /// Creates a listener.
    pub fn new(
        bus: Arc<dyn MessageBus>,
        source: Arc<dyn DeviceSource>,
        control: Arc<dyn DeviceControl>,
        options: HomeAssistantListenerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                bus,
                source,
                control,
                options,
                devices: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the ids this listener is subscribed for.
    #[must_use]
    pub fn subscribed(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.inner.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Listener for HomeAssistantListener {
    fn name(&self) -> &'static str {
        "homeassistant"
    }

    async fn listen(
        &self,
        snapshot: &DeviceSnapshot,
        callback: Arc<dyn StateChangedCallback>,
    ) -> Result<()> {
        let is_new = {
            let mut devices = self.inner.devices.write();
            match devices.entry(snapshot.id.clone()) {
                Entry::Occupied(mut known) => {
                    known.insert(snapshot.clone());
                    false
                }
                Entry::Vacant(slot) => {
                    slot.insert(snapshot.clone());
                    true
                }
            }
        };
        if !is_new {
            return Ok(());
        }

        let topic = topics::switch_topic(
            &self.inner.options.discovery_prefix,
            snapshot.id.as_str(),
            LEAF_SET,
        );
        let handler = Arc::new(CommandHandler {
            inner: Arc::clone(&self.inner),
            callback,
        });

        if let Err(e) = self
            .inner
            .bus
            .subscribe(&topic, QoS::AtLeastOnce, handler)
            .await
        {
            self.inner.devices.write().remove(&snapshot.id);
            return Err(e.into());
        }

        tracing::info!(topic = %topic, device = %snapshot.id, "Subscribed to switch commands");
        Ok(())
    }
}

impl std::fmt::Debug for HomeAssistantListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeAssistantListener")
            .field("options", &self.inner.options)
            .field("devices", &self.inner.devices.read().len())
            .finish_non_exhaustive()
    }
}

/// Bus handler for one device's command topic.
struct CommandHandler {
    inner: Arc<ListenerInner>,
    callback: Arc<dyn StateChangedCallback>,
}

impl CommandHandler {
    async fn apply(&self, id: &DeviceId, on: bool) -> Result<DeviceSnapshot> {
        let address = self
            .inner
            .devices
            .read()
            .get(id)
            .map(|d| d.info.network_address.clone())
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?;

        let timeout = self.inner.options.timeout;
        self.inner.control.set_power(&address, on, timeout).await?;
        self.inner.source.collect_one(&address, timeout).await
    }
}

#[async_trait]
impl MessageHandler for CommandHandler {
    async fn handle(&self, message: BusMessage) {
        let Some(id) =
            topics::parse_command_topic(&self.inner.options.discovery_prefix, &message.topic)
        else {
            tracing::warn!(topic = %message.topic, "Cannot determine device id from topic");
            return;
        };
        let id = DeviceId::from_raw(id);

        let payload = message.payload_str();
        tracing::info!(device = %id, payload = %payload, "Received switch command");

        let on = match &*payload {
            PAYLOAD_ON => true,
            PAYLOAD_OFF => false,
            other => {
                tracing::warn!(device = %id, payload = %other, "Ignoring unrecognized payload");
                return;
            }
        };

        match self.apply(&id, on).await {
            Ok(snapshot) => self.callback.state_changed(snapshot).await,
            Err(Error::DeviceNotFound(_)) => {
                tracing::warn!(device = %id, "Command for unknown device");
            }
            Err(e) => {
                tracing::error!(device = %id, error = %e, "Failed to apply switch command");
            }
        }
    }
}
