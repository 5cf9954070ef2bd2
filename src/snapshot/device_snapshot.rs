// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-in-time device snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attribute::{
    DeviceAttribute, PROPERTY_CURRENT, PROPERTY_ON, PROPERTY_POWER, PROPERTY_VOLTAGE,
};
use super::device_id::DeviceId;

/// Vendor name reported for every device this bridge talks to.
pub const VENDOR: &str = "TPLink";

/// Near-static descriptive data about a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// User-assigned alias.
    pub friendly_name: String,
    /// Hardware model.
    pub model: String,
    /// Network address the device answered on.
    pub network_address: String,
    /// Vendor name.
    pub vendor: String,
    /// Attributes the device exposes, in declaration order.
    pub exposes: Vec<DeviceAttribute>,
}

/// Measurements taken during one poll.
///
/// Metering fields are `None` unless the device exposes the matching
/// attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Relay state.
    pub is_on: bool,
    /// Output current in Amperes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f32>,
    /// Output power in Watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f32>,
    /// Input voltage in Volts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f32>,
}

/// Instantaneous power-meter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    /// Volts.
    pub voltage: f32,
    /// Amperes.
    pub current: f32,
    /// Watts.
    pub power: f32,
}

/// Identity and observed state of one device at one instant.
///
/// Snapshots are built fresh on every poll and never mutated afterwards.
/// Equality is structural over id, info (including attribute order) and
/// state; it is what drives change detection.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::snapshot::{DeviceId, DeviceSnapshot};
///
/// let off = DeviceSnapshot::builder(DeviceId::from_raw("0xabc"), "Lamp").build();
/// let on = DeviceSnapshot::builder(DeviceId::from_raw("0xabc"), "Lamp")
///     .on(true)
///     .build();
///
/// assert!(on.differs_from(Some(&off)));
/// assert!(!on.differs_from(Some(&on.clone())));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Stable identifier.
    pub id: DeviceId,
    /// Mutable measurements.
    pub state: DeviceState,
    /// Descriptive data.
    pub info: DeviceInfo,
}

impl DeviceSnapshot {
    /// Starts building a snapshot for a relay-only device.
    #[must_use]
    pub fn builder(id: DeviceId, friendly_name: impl Into<String>) -> DeviceSnapshotBuilder {
        DeviceSnapshotBuilder::new(id, friendly_name)
    }

    /// Returns `true` if this snapshot should be dispatched given the last
    /// one observed for the same device.
    #[must_use]
    pub fn differs_from(&self, previous: Option<&DeviceSnapshot>) -> bool {
        previous.is_none_or(|prev| prev != self)
    }

    /// Returns `true` if the device declares the attribute with this property.
    #[must_use]
    pub fn exposes(&self, property: &str) -> bool {
        self.info.exposes.iter().any(|a| a.property == property)
    }

    /// Returns the value for an exposed property.
    ///
    /// Returns `None` for undeclared properties and for declared metering
    /// properties that have no reading.
    #[must_use]
    pub fn value_of(&self, property: &str) -> Option<Value> {
        if !self.exposes(property) {
            return None;
        }
        match property {
            PROPERTY_ON => Some(Value::Bool(self.state.is_on)),
            PROPERTY_VOLTAGE => self.state.voltage.map(Value::from),
            PROPERTY_CURRENT => self.state.current.map(Value::from),
            PROPERTY_POWER => self.state.power.map(Value::from),
            _ => None,
        }
    }
}

/// Builder for [`DeviceSnapshot`].
///
/// Keeps state and declared attributes consistent: metering values can only
/// be set together with their attributes.
#[derive(Debug, Clone)]
pub struct DeviceSnapshotBuilder {
    snapshot: DeviceSnapshot,
}

impl DeviceSnapshotBuilder {
    fn new(id: DeviceId, friendly_name: impl Into<String>) -> Self {
        Self {
            snapshot: DeviceSnapshot {
                id,
                state: DeviceState::default(),
                info: DeviceInfo {
                    friendly_name: friendly_name.into(),
                    model: String::new(),
                    network_address: String::new(),
                    vendor: VENDOR.to_string(),
                    exposes: vec![DeviceAttribute::on()],
                },
            },
        }
    }

    /// Sets the hardware model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.snapshot.info.model = model.into();
        self
    }

    /// Sets the network address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.snapshot.info.network_address = address.into();
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn on(mut self, is_on: bool) -> Self {
        self.snapshot.state.is_on = is_on;
        self
    }

    /// Adds a meter reading and declares the metering attributes.
    #[must_use]
    pub fn meter(mut self, reading: MeterReading) -> Self {
        self.snapshot.state.voltage = Some(reading.voltage);
        self.snapshot.state.current = Some(reading.current);
        self.snapshot.state.power = Some(reading.power);
        if !self.snapshot.exposes(PROPERTY_VOLTAGE) {
            self.snapshot.info.exposes.extend(DeviceAttribute::metering());
        }
        self
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> DeviceSnapshot {
        self.snapshot
    }
}
