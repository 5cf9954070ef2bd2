// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Standard destination: device registry plus per-device status documents.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::{ParseError, Result};
use crate::protocol::{MessageBus, QoS};
use crate::snapshot::{DeviceId, DeviceSnapshot};
use crate::topics;

use super::Destination;

/// Publishes the device registry and plain JSON status documents.
///
/// The registry at `<base>/bridge/devices` is a retained array of every
/// device this destination has seen, republished only when a new id shows
/// up. Status goes to `<base>/<friendly_name>` (lower-cased, spaces turned
/// into underscores) as `{"id": ..., <property>: <value>, ...}`, one key per
/// exposed attribute.
pub struct StandardDestination {
    bus: Arc<dyn MessageBus>,
    base_topic: String,
    /// Devices already in the registry, in first-seen order.
    registry: Mutex<Vec<DeviceSnapshot>>,
    /// Held from building a registry document until it is recorded.
    registry_publish: tokio::sync::Mutex<()>,
}

impl StandardDestination {
    /// Creates a destination publishing under `base_topic`.
    pub fn new(bus: Arc<dyn MessageBus>, base_topic: impl Into<String>) -> Self {
        Self {
            bus,
            base_topic: base_topic.into(),
            registry: Mutex::new(Vec::new()),
            registry_publish: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the ids currently listed in the registry.
    #[must_use]
    pub fn registered(&self) -> Vec<DeviceId> {
        self.registry.lock().iter().map(|d| d.id.clone()).collect()
    }

    /// Builds the registry document including `snapshot`, or `None` if the
    /// device is already listed.
    fn pending_registry(&self, snapshot: &DeviceSnapshot) -> Option<Vec<DeviceSnapshot>> {
        let registry = self.registry.lock();
        if registry.iter().any(|d| d.id == snapshot.id) {
            return None;
        }
        let mut devices = registry.clone();
        devices.push(snapshot.clone());
        Some(devices)
    }

    async fn publish_registry(&self, snapshot: &DeviceSnapshot) -> Result<()> {
        let _publishing = self.registry_publish.lock().await;
        let Some(devices) = self.pending_registry(snapshot) else {
            return Ok(());
        };

        let payload = serde_json::to_vec(&devices).map_err(ParseError::Json)?;
        let topic = topics::registry_topic(&self.base_topic);
        tracing::info!(topic = %topic, device = %snapshot.id, "Publishing device registry");
        self.bus.publish(&topic, QoS::AtLeastOnce, true, payload).await?;

        self.registry.lock().push(snapshot.clone());
        Ok(())
    }

    async fn publish_status(&self, snapshot: &DeviceSnapshot) -> Result<()> {
        let payload = serde_json::to_vec(&status_document(snapshot)).map_err(ParseError::Json)?;
        let topic = topics::status_topic(&self.base_topic, &snapshot.info.friendly_name);
        tracing::info!(topic = %topic, device = %snapshot.id, "Publishing device status");
        self.bus.publish(&topic, QoS::AtLeastOnce, false, payload).await?;
        Ok(())
    }
}

/// Builds `{"id": ..., <property>: <value>, ...}` from the exposed attributes.
pub(crate) fn status_document(snapshot: &DeviceSnapshot) -> Map<String, Value> {
    let mut document = Map::new();
    document.insert("id".to_string(), Value::String(snapshot.id.to_string()));
    for attribute in &snapshot.info.exposes {
        if let Some(value) = snapshot.value_of(&attribute.property) {
            document.insert(attribute.property.clone(), value);
        }
    }
    document
}

#[async_trait]
impl Destination for StandardDestination {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn publish(&self, snapshot: &DeviceSnapshot) -> Result<()> {
        self.publish_registry(snapshot).await?;
        self.publish_status(snapshot).await
    }
}

impl std::fmt::Debug for StandardDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardDestination")
            .field("base_topic", &self.base_topic)
            .field("registered", &self.registry.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MeterReading;
    use crate::testing::RecordingBus;
    use serde_json::json;

    fn lamp(on: bool) -> DeviceSnapshot {
        DeviceSnapshot::builder(DeviceId::from_raw("0xabc"), "Lamp")
            .model("HS100(UK)")
            .address("192.168.2.10")
            .on(on)
            .build()
    }

    #[test]
    fn status_document_follows_exposes() {
        let metered = DeviceSnapshot::builder(DeviceId::from_raw("0x1"), "Kettle")
            .on(true)
            .meter(MeterReading {
                voltage: 230.0,
                current: 1.5,
                power: 345.0,
            })
            .build();

        let document = Value::Object(status_document(&metered));
        assert_eq!(
            document,
            json!({ "id": "0x1", "on": true, "voltage": 230.0, "power": 345.0, "current": 1.5 })
        );
    }

    #[test]
    fn status_document_omits_undeclared_values() {
        let mut snapshot = lamp(false);
        snapshot.state.power = Some(10.0);
        let document = Value::Object(status_document(&snapshot));
        assert_eq!(document, json!({ "id": "0xabc", "on": false }));
    }

    #[tokio::test]
    async fn registry_is_published_once_per_device() {
        let bus = Arc::new(RecordingBus::new());
        let destination = StandardDestination::new(bus.clone(), "tplink2mqtt");

        destination.publish(&lamp(false)).await.unwrap();
        destination.publish(&lamp(true)).await.unwrap();

        let registry = bus.published_to("tplink2mqtt/bridge/devices");
        assert_eq!(registry.len(), 1);
        assert!(registry[0].retain);
        let devices: Value = serde_json::from_slice(&registry[0].payload).unwrap();
        assert_eq!(devices.as_array().unwrap().len(), 1);
        assert_eq!(devices[0]["id"], "0xabc");
        assert_eq!(devices[0]["info"]["friendly_name"], "Lamp");

        let status = bus.published_to("tplink2mqtt/lamp");
        assert_eq!(status.len(), 2);
        assert!(!status[1].retain);
        assert_eq!(status[1].json(), json!({ "id": "0xabc", "on": true }));
    }

    #[tokio::test]
    async fn registry_grows_in_first_seen_order() {
        let bus = Arc::new(RecordingBus::new());
        let destination = StandardDestination::new(bus.clone(), "plugs");

        let fan = DeviceSnapshot::builder(DeviceId::from_raw("0xfan"), "Desk Fan").build();
        destination.publish(&lamp(false)).await.unwrap();
        destination.publish(&fan).await.unwrap();

        let registry = bus.published_to("plugs/bridge/devices");
        assert_eq!(registry.len(), 2);
        let ids: Vec<_> = registry[1]
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].clone())
            .collect();
        assert_eq!(ids, [json!("0xabc"), json!("0xfan")]);
        assert_eq!(bus.published_to("plugs/desk_fan").len(), 1);
        assert_eq!(
            destination.registered(),
            [DeviceId::from_raw("0xabc"), DeviceId::from_raw("0xfan")]
        );
    }

    #[tokio::test]
    async fn overlapping_new_devices_both_reach_the_registry() {
        let bus = Arc::new(RecordingBus::new());
        bus.yield_on_publish(true);
        let destination = StandardDestination::new(bus.clone(), "tplink2mqtt");
        let fan = DeviceSnapshot::builder(DeviceId::from_raw("0xfan"), "Desk Fan").build();
        let lamp = lamp(false);

        let (lamp_result, fan_result) =
            tokio::join!(destination.publish(&lamp), destination.publish(&fan));
        lamp_result.unwrap();
        fan_result.unwrap();

        let registry = bus.published_to("tplink2mqtt/bridge/devices");
        assert_eq!(registry.len(), 2);
        let latest = registry[1].json();
        let ids: Vec<_> = latest.as_array().unwrap().iter().map(|d| d["id"].clone()).collect();
        assert_eq!(ids, [json!("0xabc"), json!("0xfan")]);
        assert_eq!(destination.registered().len(), 2);
    }

    #[tokio::test]
    async fn failed_registry_publish_is_retried_on_next_change() {
        let bus = Arc::new(RecordingBus::new());
        let destination = StandardDestination::new(bus.clone(), "tplink2mqtt");

        bus.set_connected(false);
        assert!(destination.publish(&lamp(false)).await.is_err());
        assert!(destination.registered().is_empty());
        assert!(bus.published().is_empty());

        bus.set_connected(true);
        destination.publish(&lamp(true)).await.unwrap();
        assert_eq!(bus.published_to("tplink2mqtt/bridge/devices").len(), 1);
        assert_eq!(bus.published_to("tplink2mqtt/lamp").len(), 1);
    }
}
