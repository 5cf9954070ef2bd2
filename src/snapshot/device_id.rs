// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix put in front of every hardware identifier.
const ID_PREFIX: &str = "0x";

/// Stable identifier of a physical device.
///
/// The identifier appears verbatim in bus topics, so its derivation from the
/// hardware id must never change: the hardware id is lower-cased and prefixed
/// with `0x`.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::snapshot::DeviceId;
///
/// let id = DeviceId::from_hardware_id("8006ABCDEF0123");
/// assert_eq!(id.as_str(), "0x8006abcdef0123");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Derives the identifier from the hardware id reported by the device.
    #[must_use]
    pub fn from_hardware_id(hardware_id: &str) -> Self {
        Self(format!("{ID_PREFIX}{}", hardware_id.to_lowercase()))
    }

    /// Wraps an already-derived identifier, as found in a topic.
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
