// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection.
//!
//! This module provides the long-lived MQTT connection the bridge publishes
//! and subscribes through. The event loop runs on its own task: it keeps
//! polling after connection errors so `rumqttc` reconnects, reports every
//! transition on a status channel, replays subscriptions after a reconnect,
//! and hands each inbound publish to its handler on a fresh task.
//!
//! # Examples
//!
//! ```no_run
//! use tplink2mqtt::protocol::MqttBroker;
//!
//! # async fn example() -> tplink2mqtt::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! let mut status = broker.watch_status();
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         println!("bus is now {:?}", *status.borrow());
//!     }
//! });
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::sync::{oneshot, watch};

use crate::error::ProtocolError;

use super::{BusMessage, ConnectionStatus, MessageBus, MessageHandler, QoS, TopicRouter};

/// Pause between reconnection attempts after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the outgoing request queue.
const REQUEST_CAPACITY: usize = 100;

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::AtMostOnce,
            QoS::AtLeastOnce => Self::AtLeastOnce,
            QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    request_timeout: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: "tplink2mqtt".to_string(),
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// An MQTT broker connection shared by every destination and listener.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing.
    client: AsyncClient,
    /// Subscribed topics and their handlers.
    router: TopicRouter,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status flag.
    connected: AtomicBool,
    /// Set once `disconnect` was requested.
    shutdown: AtomicBool,
    /// Connection status transitions.
    status: watch::Sender<ConnectionStatus>,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns a receiver that observes every connection status transition.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Returns the number of subscribed topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.router.len()
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.inner
            .connected
            .store(status == ConnectionStatus::Connected, Ordering::Release);
        self.inner.status.send_replace(status);
    }

    /// Routes an incoming message to its subscription handler.
    fn route_message(&self, topic: &str, payload: Vec<u8>) {
        let Some(handler) = self.inner.router.handler_for(topic) else {
            tracing::trace!(topic = %topic, "No handler for topic");
            return;
        };

        let message = BusMessage::new(topic, payload);
        tokio::spawn(async move {
            handler.handle(message).await;
        });
    }

    /// Replays every subscription after a reconnect.
    ///
    /// Runs on its own task: the request queue is drained by the event loop,
    /// which must not wait on it.
    fn resubscribe_all(&self) {
        let subscriptions = self.inner.router.subscriptions();
        if subscriptions.is_empty() {
            return;
        }

        let client = self.inner.client.clone();
        tokio::spawn(async move {
            for (topic, qos) in subscriptions {
                if let Err(e) = client.subscribe(&topic, qos.into()).await {
                    tracing::warn!(topic = %topic, error = %e, "Failed to resubscribe");
                }
            }
            tracing::info!("Restored subscriptions after reconnect");
        });
    }

    async fn with_request_timeout<F>(&self, request: F) -> Result<(), ProtocolError>
    where
        F: Future<Output = Result<(), rumqttc::ClientError>>,
    {
        let timeout = self.inner.config.request_timeout;

        // Safe: timeouts are seconds, far below u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))?
            .map_err(ProtocolError::Mqtt)
    }

    /// Disconnects from the broker and stops the event loop.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be sent.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.shutdown.store(true, Ordering::Release);
        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.set_status(ConnectionStatus::Disconnected("client disconnect".to_string()));
        Ok(())
    }
}

#[async_trait]
impl MessageBus for MqttBroker {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }

        tracing::debug!(topic = %topic, retain, bytes = payload.len(), "Publishing MQTT message");
        self.with_request_timeout(self.inner.client.publish(topic, qos.into(), retain, payload))
            .await
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }

        self.with_request_timeout(self.inner.client.subscribe(topic, qos.into()))
            .await?;
        self.inner.router.register(topic, qos, handler);

        tracing::debug!(topic = %topic, "Subscribed to topic");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use tplink2mqtt::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> tplink2mqtt::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .client_id("tplink2mqtt")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the client identifier (default: `tplink2mqtt`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets how long a publish or subscribe may wait for queue space
    /// (default: 5 seconds).
    #[must_use]
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.config.request_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let mut mqtt_options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (status, _) = watch::channel(ConnectionStatus::Connecting);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                router: TopicRouter::new(),
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                status,
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();
        let broker_clone = broker.clone();
        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, connack_tx).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    "Connected to MQTT broker"
                );
                Ok(broker)
            }
            Ok(Err(_)) => {
                let reason = match &*broker.inner.status.borrow() {
                    ConnectionStatus::Disconnected(reason) => reason.clone(),
                    _ => "MQTT event loop terminated unexpectedly".to_string(),
                };
                Err(ProtocolError::ConnectionFailed(reason))
            }
            Err(_) => {
                broker.inner.shutdown.store(true, Ordering::Release);
                Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}

/// Drives the MQTT event loop for the lifetime of the connection.
///
/// Before the first CONNACK any error is fatal, so a bad host fails the
/// build quickly. Afterwards errors only flip the status and the loop keeps
/// polling, which makes `rumqttc` reconnect.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    connack_tx: oneshot::Sender<()>,
) {
    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.set_status(ConnectionStatus::Connected);
                match connack_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(());
                    }
                    None => {
                        tracing::info!("Reconnected to MQTT broker");
                        broker.resubscribe_all();
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(topic = %publish.topic, "MQTT message received");
                broker.route_message(&publish.topic, publish.payload.to_vec());
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("MQTT broker sent disconnect");
                broker.set_status(ConnectionStatus::Disconnected(
                    "broker sent disconnect".to_string(),
                ));
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT client disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT broker event loop error");
                broker.set_status(ConnectionStatus::Disconnected(e.to_string()));
                if connack_tx.is_some() || broker.inner.shutdown.load(Ordering::Acquire) {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    tracing::debug!("MQTT event loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttBrokerBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert_eq!(builder.config.client_id, "tplink2mqtt");
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
        assert_eq!(builder.config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn builder_chain() {
        let builder = MqttBrokerBuilder::default()
            .host("192.168.1.50")
            .port(8883)
            .client_id("bridge-2")
            .credentials("admin", "secret")
            .keep_alive(Duration::from_secs(45))
            .connection_timeout(Duration::from_secs(15))
            .request_timeout(Duration::from_secs(1));

        assert_eq!(builder.config.host, "192.168.1.50");
        assert_eq!(builder.config.port, 8883);
        assert_eq!(builder.config.client_id, "bridge-2");
        assert_eq!(
            builder.config.credentials,
            Some(("admin".to_string(), "secret".to_string()))
        );
        assert_eq!(builder.config.keep_alive, Duration::from_secs(45));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(15));
        assert_eq!(builder.config.request_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttBrokerBuilder::default().build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn unreachable_broker_fails_fast() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_secs(5))
            .build()
            .await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }

    #[test]
    fn qos_maps_to_rumqttc() {
        assert_eq!(rumqttc::QoS::from(QoS::AtMostOnce), rumqttc::QoS::AtMostOnce);
        assert_eq!(rumqttc::QoS::from(QoS::AtLeastOnce), rumqttc::QoS::AtLeastOnce);
        assert_eq!(rumqttc::QoS::from(QoS::ExactlyOnce), rumqttc::QoS::ExactlyOnce);
    }
}
