// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory bus and plug fakes for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use tplink2mqtt::error::{Error, ProtocolError, Result};
use tplink2mqtt::protocol::{BusMessage, MessageBus, MessageHandler, QoS};
use tplink2mqtt::source::{DeviceControl, DeviceSource, Subnet};
use tplink2mqtt::{DeviceId, DeviceSnapshot};

#[derive(Debug, Clone)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Vec<u8>,
}

impl Published {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.payload).expect("payload is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A bus that records publishes and keeps subscription handlers.
#[derive(Default)]
pub struct MemoryBus {
    published: Mutex<Vec<Published>>,
    handlers: Mutex<HashMap<String, Arc<dyn MessageHandler>>>,
    subscribe_calls: AtomicUsize,
}

impl MemoryBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<Published> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.handlers.lock().contains_key(topic)
    }

    /// Delivers a message and waits for its handler to finish.
    pub async fn deliver(&self, topic: &str, payload: &str) {
        self.deliver_through(topic, topic, payload).await;
    }

    /// Hands a message on `topic` to the handler subscribed on `via`.
    pub async fn deliver_through(&self, via: &str, topic: &str, payload: &str) {
        let handler = self.handlers.lock().get(via).cloned();
        if let Some(handler) = handler {
            handler.handle(BusMessage::new(topic, payload)).await;
        }
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> std::result::Result<(), ProtocolError> {
        self.published.lock().push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        _qos: QoS,
        handler: Arc<dyn MessageHandler>,
    ) -> std::result::Result<(), ProtocolError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert(topic.to_string(), handler);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Simulated plugs keyed by address.
#[derive(Default)]
pub struct FakePlugs {
    plugs: Mutex<BTreeMap<String, DeviceSnapshot>>,
    pub control_calls: Mutex<Vec<(String, bool)>>,
    pub collect_calls: Mutex<Vec<String>>,
}

impl FakePlugs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, snapshot: DeviceSnapshot) {
        self.plugs
            .lock()
            .insert(snapshot.info.network_address.clone(), snapshot);
    }

    pub fn control_calls(&self) -> Vec<(String, bool)> {
        self.control_calls.lock().clone()
    }

    pub fn collect_calls(&self) -> Vec<String> {
        self.collect_calls.lock().clone()
    }
}

#[async_trait]
impl DeviceSource for FakePlugs {
    async fn discover_all(&self, _subnet: &Subnet, _timeout: Duration) -> Result<Vec<DeviceSnapshot>> {
        Ok(self.plugs.lock().values().cloned().collect())
    }

    async fn collect_one(&self, address: &str, _timeout: Duration) -> Result<DeviceSnapshot> {
        self.collect_calls.lock().push(address.to_string());
        self.plugs
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound(address.to_string()))
    }
}

#[async_trait]
impl DeviceControl for FakePlugs {
    async fn set_power(&self, address: &str, on: bool, _timeout: Duration) -> Result<()> {
        self.control_calls.lock().push((address.to_string(), on));
        match self.plugs.lock().get_mut(address) {
            Some(plug) => {
                plug.state.is_on = on;
                Ok(())
            }
            None => Err(ProtocolError::ConnectionFailed(address.to_string()).into()),
        }
    }
}

pub fn lamp(on: bool) -> DeviceSnapshot {
    DeviceSnapshot::builder(DeviceId::from_raw("0xabc"), "Lamp")
        .model("HS100(UK)")
        .address("192.168.2.10")
        .on(on)
        .build()
}
