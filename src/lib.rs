// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # tplink2mqtt
//!
//! Bridges TP-Link Kasa smart plugs to an MQTT broker.
//!
//! The [`Bridge`] sweeps a subnet on an interval, keeps the last snapshot of
//! every plug it has seen, and pushes new or changed snapshots through a list
//! of [`Destination`]s (a plain JSON layout and Home Assistant discovery) and
//! [`Listener`]s (Home Assistant switch commands). A command received by a
//! listener is applied to the plug, read back, and dispatched again right
//! away.
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`snapshot`] | Device identity, attributes and measurements |
//! | [`command`], [`response`] | Kasa request documents and reply parsing |
//! | [`protocol`] | Kasa TCP transport and the MQTT bus |
//! | [`source`] | Subnet discovery and relay control |
//! | [`destination`], [`listener`] | Bus-facing plug-ins |
//! | [`bridge`] | Poll loop, change detection and fan-out |
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tplink2mqtt::{Bridge, HomeAssistantDestination, KasaSource, MqttBroker, StandardDestination};
//!
//! #[tokio::main]
//! async fn main() -> tplink2mqtt::Result<()> {
//!     let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//!
//!     let bridge = Bridge::builder(Arc::new(KasaSource::new()))
//!         .destination(Arc::new(StandardDestination::new(broker.clone(), "tplink2mqtt")))
//!         .destination(Arc::new(HomeAssistantDestination::new(broker.clone(), "homeassistant")))
//!         .build();
//!
//!     bridge.run(broker.watch_status()).await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod command;
pub mod config;
pub mod destination;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod response;
pub mod snapshot;
pub mod source;
pub mod topics;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, BridgeBuilder, BridgeOptions};
pub use config::Config;
pub use destination::{Destination, HomeAssistantDestination, StandardDestination};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use listener::{
    HomeAssistantListener, HomeAssistantListenerOptions, Listener, StateChangedCallback,
};
#[cfg(feature = "mqtt")]
pub use protocol::MqttBroker;
pub use protocol::{ConnectionStatus, KasaClient, MessageBus, QoS};
pub use snapshot::{DeviceId, DeviceSnapshot};
pub use source::{DeviceControl, DeviceSource, KasaSource, Subnet};
