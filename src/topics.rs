// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus topic layout.
//!
//! | Topic | Retained | Producer |
//! |-------|----------|----------|
//! | `<base>/bridge/devices` | yes | standard destination |
//! | `<base>/<friendly_name>` | no | standard destination |
//! | `<prefix>/switch/<id>/config` | yes | Home Assistant destination |
//! | `<prefix>/switch/<id>/state` | yes | Home Assistant destination |
//! | `<prefix>/switch/<id>/set` | - | consumed by the Home Assistant listener |

/// Default namespace of the standard destination.
pub const DEFAULT_BASE_TOPIC: &str = "tplink2mqtt";

/// Default Home Assistant discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Relay-on payload.
pub const PAYLOAD_ON: &str = "ON";

/// Relay-off payload.
pub const PAYLOAD_OFF: &str = "OFF";

/// Leaf of the discovery configuration topic.
pub const LEAF_CONFIG: &str = "config";

/// Leaf of the state topic.
pub const LEAF_STATE: &str = "state";

/// Leaf of the command topic.
pub const LEAF_SET: &str = "set";

/// Returns the registry topic for `base`.
#[must_use]
pub fn registry_topic(base: &str) -> String {
    format!("{base}/bridge/devices")
}

/// Returns the per-device status topic for `base`.
///
/// ```
/// use tplink2mqtt::topics::status_topic;
///
/// assert_eq!(status_topic("tplink2mqtt", "Living Room Lamp"), "tplink2mqtt/living_room_lamp");
/// ```
#[must_use]
pub fn status_topic(base: &str, friendly_name: &str) -> String {
    format!("{base}/{}", sanitize_friendly_name(friendly_name))
}

/// Lower-cases a friendly name and replaces spaces with underscores.
#[must_use]
pub fn sanitize_friendly_name(friendly_name: &str) -> String {
    friendly_name.to_lowercase().replace(' ', "_")
}

/// Returns `<prefix>/switch/<id>/<leaf>`.
#[must_use]
pub fn switch_topic(prefix: &str, id: &str, leaf: &str) -> String {
    format!("{prefix}/switch/{id}/{leaf}")
}

/// Extracts the device id from a command topic.
///
/// Returns `None` unless the topic has the exact shape
/// `<prefix>/switch/<id>/set` with a non-empty id.
///
/// ```
/// use tplink2mqtt::topics::parse_command_topic;
///
/// assert_eq!(parse_command_topic("homeassistant", "homeassistant/switch/0xabc/set"), Some("0xabc"));
/// assert_eq!(parse_command_topic("homeassistant", "homeassistant/switch/0xabc/state"), None);
/// ```
#[must_use]
pub fn parse_command_topic<'a>(prefix: &str, topic: &'a str) -> Option<&'a str> {
    let id = topic
        .strip_prefix(prefix)?
        .strip_prefix("/switch/")?
        .strip_suffix("/set")?;
    (!id.is_empty()).then_some(id)
}
