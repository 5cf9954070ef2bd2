// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery destination.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ParseError, Result};
use crate::protocol::{MessageBus, QoS};
use crate::snapshot::DeviceSnapshot;
use crate::topics::{self, LEAF_CONFIG, LEAF_SET, LEAF_STATE, PAYLOAD_OFF, PAYLOAD_ON};

use super::Destination;

/// Discovery document for a switch entity.
#[derive(Debug, Serialize)]
struct SwitchConfig<'a> {
    name: &'a str,
    command_topic: String,
    state_topic: String,
    device: DeviceRegistryEntry<'a>,
    unique_id: &'a str,
}

#[derive(Debug, Serialize)]
struct DeviceRegistryEntry<'a> {
    manufacturer: &'a str,
    connections: [[&'a str; 2]; 1],
    identifiers: [&'a str; 1],
    model: &'a str,
    name: &'a str,
}

impl<'a> SwitchConfig<'a> {
    fn new(prefix: &str, snapshot: &'a DeviceSnapshot) -> Self {
        let id = snapshot.id.as_str();
        let info = &snapshot.info;
        Self {
            name: &info.friendly_name,
            command_topic: topics::switch_topic(prefix, id, LEAF_SET),
            state_topic: topics::switch_topic(prefix, id, LEAF_STATE),
            device: DeviceRegistryEntry {
                manufacturer: &info.vendor,
                connections: [["ip", info.network_address.as_str()]],
                identifiers: [id],
                model: &info.model,
                name: &info.friendly_name,
            },
            unique_id: id,
        }
    }
}

/// Publishes Home Assistant discovery config and switch state.
///
/// Both documents are retained and sent on every change, config first:
/// `<prefix>/switch/<id>/config` then `<prefix>/switch/<id>/state` with a
/// plain `ON` or `OFF` payload.
#[derive(Clone)]
pub struct HomeAssistantDestination {
    bus: Arc<dyn MessageBus>,
    discovery_prefix: String,
}

impl HomeAssistantDestination {
    /// Creates a destination using `discovery_prefix` (usually `homeassistant`).
    pub fn new(bus: Arc<dyn MessageBus>, discovery_prefix: impl Into<String>) -> Self {
        Self {
            bus,
            discovery_prefix: discovery_prefix.into(),
        }
    }
}

#[async_trait]
impl Destination for HomeAssistantDestination {
    fn name(&self) -> &'static str {
        "homeassistant"
    }

    async fn publish(&self, snapshot: &DeviceSnapshot) -> Result<()> {
        let id = snapshot.id.as_str();

        let config = SwitchConfig::new(&self.discovery_prefix, snapshot);
        let payload = serde_json::to_vec(&config).map_err(ParseError::Json)?;
        let topic = topics::switch_topic(&self.discovery_prefix, id, LEAF_CONFIG);
        tracing::info!(topic = %topic, device = %id, "Publishing discovery config");
        self.bus.publish(&topic, QoS::AtLeastOnce, true, payload).await?;

        let state = if snapshot.state.is_on {
            PAYLOAD_ON
        } else {
            PAYLOAD_OFF
        };
        let topic = topics::switch_topic(&self.discovery_prefix, id, LEAF_STATE);
        tracing::info!(topic = %topic, device = %id, state, "Publishing switch state");
        self.bus
            .publish(&topic, QoS::AtLeastOnce, true, state.as_bytes().to_vec())
            .await?;

        Ok(())
    }
}

impl std::fmt::Debug for HomeAssistantDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeAssistantDestination")
            .field("discovery_prefix", &self.discovery_prefix)
            .finish_non_exhaustive()
    }
}
