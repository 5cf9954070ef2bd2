// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory bus and device fakes shared by unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::destination::Destination;
use crate::error::{Error, ProtocolError, Result};
use crate::listener::{Listener, StateChangedCallback};
use crate::protocol::{BusMessage, MessageBus, MessageHandler, QoS, TopicRouter};
use crate::snapshot::{DeviceId, DeviceSnapshot};
use crate::source::{DeviceControl, DeviceSource, Subnet};

#[derive(Debug, Clone)]
pub(crate) struct PublishedMessage {
    pub topic: String,
    pub retain: bool,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.payload).unwrap()
    }
}

/// Records publishes and routes delivered messages to subscribed handlers.
pub(crate) struct RecordingBus {
    connected: AtomicBool,
    yield_on_publish: AtomicBool,
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<String>>,
    router: TopicRouter,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            yield_on_publish: AtomicBool::new(false),
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            router: TopicRouter::new(),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes every publish yield to the scheduler before it is recorded.
    pub fn yield_on_publish(&self, enabled: bool) {
        self.yield_on_publish.store(enabled, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    /// Runs the handler for `topic` to completion.
    pub async fn deliver(&self, topic: &str, payload: &str) {
        if let Some(handler) = self.router.handler_for(topic) {
            handler.handle(BusMessage::new(topic, payload)).await;
        }
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(
        &self,
        topic: &str,
        _qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> std::result::Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        if self.yield_on_publish.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            retain,
            payload,
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        handler: Arc<dyn MessageHandler>,
    ) -> std::result::Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        self.subscriptions.lock().push(topic.to_string());
        self.router.register(topic, qos, handler);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Plugs keyed by address, answering discovery, reads and relay switches.
#[derive(Default)]
pub(crate) struct FakeDevices {
    devices: Mutex<BTreeMap<String, DeviceSnapshot>>,
    fail_discovery: AtomicBool,
    discover_calls: AtomicUsize,
    control_calls: Mutex<Vec<(String, bool)>>,
    collect_calls: Mutex<Vec<String>>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the device at the snapshot's address.
    pub fn insert(&self, snapshot: DeviceSnapshot) {
        self.devices
            .lock()
            .insert(snapshot.info.network_address.clone(), snapshot);
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn control_calls(&self) -> Vec<(String, bool)> {
        self.control_calls.lock().clone()
    }

    pub fn collect_calls(&self) -> Vec<String> {
        self.collect_calls.lock().clone()
    }
}

fn no_answer(address: &str) -> Error {
    ProtocolError::ConnectionFailed(format!("{address} did not answer")).into()
}

#[async_trait]
impl DeviceSource for FakeDevices {
    async fn discover_all(&self, _subnet: &Subnet, _timeout: Duration) -> Result<Vec<DeviceSnapshot>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(ProtocolError::ConnectionFailed("network down".to_string()).into());
        }
        Ok(self.devices.lock().values().cloned().collect())
    }

    async fn collect_one(&self, address: &str, _timeout: Duration) -> Result<DeviceSnapshot> {
        self.collect_calls.lock().push(address.to_string());
        self.devices
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| no_answer(address))
    }
}

#[async_trait]
impl DeviceControl for FakeDevices {
    async fn set_power(&self, address: &str, on: bool, _timeout: Duration) -> Result<()> {
        self.control_calls.lock().push((address.to_string(), on));
        let mut devices = self.devices.lock();
        let device = devices.get_mut(address).ok_or_else(|| no_answer(address))?;
        device.state.is_on = on;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingCallback {
    snapshots: Mutex<Vec<DeviceSnapshot>>,
}

impl RecordingCallback {
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        self.snapshots.lock().clone()
    }
}

#[async_trait]
impl StateChangedCallback for RecordingCallback {
    async fn state_changed(&self, snapshot: DeviceSnapshot) {
        self.snapshots.lock().push(snapshot);
    }
}

/// Fails every publish, or only those for one device.
pub(crate) struct FailingDestination {
    only: Option<DeviceId>,
}

impl FailingDestination {
    pub fn always() -> Self {
        Self { only: None }
    }

    pub fn for_device(id: DeviceId) -> Self {
        Self { only: Some(id) }
    }
}

#[async_trait]
impl Destination for FailingDestination {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn publish(&self, snapshot: &DeviceSnapshot) -> Result<()> {
        match &self.only {
            Some(id) if *id != snapshot.id => Ok(()),
            _ => Err(ProtocolError::NotConnected.into()),
        }
    }
}

/// Refuses every subscription and counts the attempts.
#[derive(Default)]
pub(crate) struct FailingListener {
    attempts: AtomicUsize,
}

impl FailingListener {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Listener for FailingListener {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn listen(
        &self,
        _snapshot: &DeviceSnapshot,
        _callback: Arc<dyn StateChangedCallback>,
    ) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ProtocolError::NotConnected.into())
    }
}
