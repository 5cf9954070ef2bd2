// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `get_sysinfo` reply parsing.

use serde::Deserialize;

use crate::snapshot::{DeviceId, DeviceSnapshot, DeviceSnapshotBuilder};

/// System information reported by a plug.
///
/// Only the fields the bridge uses are kept; the device sends many more.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::response::SysInfoResponse;
///
/// let json = r#"{
///     "alias": "Lamp",
///     "model": "HS110(UK)",
///     "deviceId": "8006ABCDEF",
///     "relay_state": 1,
///     "err_code": 0
/// }"#;
/// let info: SysInfoResponse = serde_json::from_str(json).unwrap();
/// assert!(info.is_on());
/// assert_eq!(info.device_id().as_str(), "0x8006abcdef");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SysInfoResponse {
    /// User-assigned alias.
    #[serde(default)]
    pub alias: String,
    /// Hardware model.
    #[serde(default)]
    pub model: String,
    /// Hardware identifier.
    #[serde(rename = "deviceId")]
    pub hardware_id: String,
    /// Relay state, `1` when on.
    #[serde(default)]
    pub relay_state: u8,
}

impl SysInfoResponse {
    /// Returns `true` if the relay is closed.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.relay_state == 1
    }

    /// Returns the stable device identifier.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::from_hardware_id(&self.hardware_id)
    }

    /// Starts a snapshot for the device answering on `address`.
    #[must_use]
    pub fn to_snapshot(&self, address: &str) -> DeviceSnapshotBuilder {
        DeviceSnapshot::builder(self.device_id(), &self.alias)
            .model(&self.model)
            .address(address)
            .on(self.is_on())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_reply() {
        let info: SysInfoResponse =
            serde_json::from_str(r#"{"deviceId":"AB12","alias":"Desk Fan"}"#).unwrap();
        assert!(!info.is_on());
        assert_eq!(info.model, "");
    }

    #[test]
    fn builds_relay_only_snapshot() {
        let info: SysInfoResponse = serde_json::from_str(
            r#"{"deviceId":"AB12","alias":"Desk Fan","model":"HS100(EU)","relay_state":1}"#,
        )
        .unwrap();

        let snapshot = info.to_snapshot("10.0.0.5").build();
        assert_eq!(snapshot.id.as_str(), "0xab12");
        assert_eq!(snapshot.info.friendly_name, "Desk Fan");
        assert_eq!(snapshot.info.network_address, "10.0.0.5");
        assert_eq!(snapshot.info.vendor, "TPLink");
        assert!(snapshot.state.is_on);
        assert_eq!(snapshot.info.exposes.len(), 1);
    }
}
