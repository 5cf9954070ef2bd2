// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports: the message bus and the smart-plug wire protocol.
//!
//! # Message bus
//!
//! The bridge only needs four primitives from the bus: publish, subscribe
//! with a handler, a connected flag, and a stream of connection status
//! changes. [`MessageBus`] captures the first three so destinations and
//! listeners can be exercised without a broker; [`MqttBroker`] implements it
//! on top of `rumqttc` and also exposes the status stream.
//!
//! # Smart plugs
//!
//! [`KasaClient`] speaks the TP-Link Kasa local protocol: length-prefixed,
//! XOR-autokey obfuscated JSON over TCP port 9999.

mod kasa;
#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_router;

pub use kasa::{DEFAULT_DEVICE_PORT, KasaClient, decrypt, encrypt};
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use topic_router::TopicRouter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProtocolError;

/// Delivery guarantee for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Delivered at least once.
    #[default]
    AtLeastOnce,
    /// Delivered exactly once.
    ExactlyOnce,
}

/// A message delivered by the bus to a subscription handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as text, lossily.
    #[must_use]
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Connection status of the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Never connected yet.
    Connecting,
    /// Connected and acknowledged by the broker.
    Connected,
    /// Connection lost, with the reason.
    Disconnected(String),
}

/// Receives messages for a subscribed topic.
///
/// Handlers run on their own task, concurrently with each other and with
/// whatever else is using the bus.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one inbound message.
    async fn handle(&self, message: BusMessage);
}

/// The bus primitives used by destinations and listeners.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the bus is disconnected or the request
    /// cannot be queued.
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError>;

    /// Subscribes to `topic`, routing every message to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription cannot be sent.
    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ProtocolError>;

    /// Returns whether the bus is currently connected.
    fn is_connected(&self) -> bool;
}
