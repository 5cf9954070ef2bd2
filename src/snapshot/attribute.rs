// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exposed device attributes.

use serde::{Deserialize, Serialize};

/// Property key of the relay attribute.
pub const PROPERTY_ON: &str = "on";
/// Property key of the voltage attribute.
pub const PROPERTY_VOLTAGE: &str = "voltage";
/// Property key of the power attribute.
pub const PROPERTY_POWER: &str = "power";
/// Property key of the current attribute.
pub const PROPERTY_CURRENT: &str = "current";

/// Value type of an exposed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// On/off flag.
    Binary,
    /// Numeric measurement.
    Numeric,
}

/// A capability the device exposes to consumers.
///
/// The set of attributes on a snapshot gates which state fields may be
/// published: a measurement whose attribute is not declared is never emitted.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::snapshot::{AttributeKind, DeviceAttribute};
///
/// let on = DeviceAttribute::on();
/// assert_eq!(on.property, "on");
/// assert_eq!(on.kind, AttributeKind::Binary);
///
/// let voltage = DeviceAttribute::voltage();
/// assert_eq!(voltage.unit, "V");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttribute {
    /// Access flags (1 = readable).
    pub access: u8,
    /// Human description.
    pub description: String,
    /// Display name.
    pub name: String,
    /// Key under which the value is published.
    pub property: String,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    /// Unit of measurement, empty for binary attributes.
    pub unit: String,
    /// Upper bound of the declared range.
    pub value_max: i32,
    /// Lower bound of the declared range.
    pub value_min: i32,
}

impl DeviceAttribute {
    fn readable(
        property: &str,
        description: &str,
        kind: AttributeKind,
        unit: &str,
        value_min: i32,
        value_max: i32,
    ) -> Self {
        Self {
            access: 1,
            description: description.to_string(),
            name: property.to_string(),
            property: property.to_string(),
            kind,
            unit: unit.to_string(),
            value_max,
            value_min,
        }
    }

    /// Relay power status.
    #[must_use]
    pub fn on() -> Self {
        Self::readable(
            PROPERTY_ON,
            "Power Status of the Switch",
            AttributeKind::Binary,
            "",
            0,
            1,
        )
    }

    /// Measured input voltage, declared as 0 to 250 V.
    ///
    /// Registry documents from earlier bridge releases carried these bounds
    /// swapped (`value_min: 250`, `value_max: -250`), so `exposes` no longer
    /// matches them byte for byte.
    #[must_use]
    pub fn voltage() -> Self {
        Self::readable(
            PROPERTY_VOLTAGE,
            "Measured input voltage",
            AttributeKind::Numeric,
            "V",
            0,
            250,
        )
    }

    /// Measured output power.
    #[must_use]
    pub fn power() -> Self {
        Self::readable(
            PROPERTY_POWER,
            "Measured output power",
            AttributeKind::Numeric,
            "W",
            0,
            2400,
        )
    }

    /// Measured output current.
    #[must_use]
    pub fn current() -> Self {
        Self::readable(
            PROPERTY_CURRENT,
            "Measured output current",
            AttributeKind::Numeric,
            "A",
            0,
            15,
        )
    }

    /// The three metering attributes, in the order a metering plug exposes them.
    #[must_use]
    pub fn metering() -> [Self; 3] {
        [Self::voltage(), Self::power(), Self::current()]
    }
}
