// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process configuration.
//!
//! Every option can be given as a flag or through a `TPLINK_`-prefixed
//! environment variable; flags win.

use std::time::Duration;

use clap::Parser;

use crate::error::ValueError;
use crate::protocol::DEFAULT_DEVICE_PORT;
use crate::source::Subnet;
use crate::topics::{DEFAULT_BASE_TOPIC, DEFAULT_DISCOVERY_PREFIX};

/// Bridges TP-Link smart plugs to an MQTT broker.
#[derive(Debug, Clone, Parser)]
#[command(name = "tplink2mqtt", version, about)]
pub struct Config {
    /// MQTT broker host
    #[arg(long, env = "TPLINK_MQTT_HOST")]
    pub mqtt_host: String,

    /// MQTT broker port
    #[arg(long, env = "TPLINK_MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT username
    #[arg(long, env = "TPLINK_MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    /// MQTT password
    #[arg(long, env = "TPLINK_MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// MQTT client identifier
    #[arg(long, env = "TPLINK_MQTT_CLIENT_ID", default_value = "tplink2mqtt")]
    pub mqtt_client_id: String,

    /// Subnet to sweep for plugs, in CIDR notation
    #[arg(long, env = "TPLINK_SUBNET", default_value = "192.168.2.0/24")]
    pub subnet: Subnet,

    /// Device request timeout in seconds
    #[arg(long, env = "TPLINK_TIMEOUT", default_value_t = 5)]
    pub timeout: u64,

    /// Seconds between poll cycles
    #[arg(long, env = "TPLINK_INTERVAL", default_value_t = 30)]
    pub interval: u64,

    /// Topic namespace for the registry and status documents
    #[arg(long, env = "TPLINK_BASE_TOPIC", default_value = DEFAULT_BASE_TOPIC)]
    pub base_topic: String,

    /// Home Assistant discovery prefix
    #[arg(long, env = "TPLINK_DISCOVERY_PREFIX", default_value = DEFAULT_DISCOVERY_PREFIX)]
    pub discovery_prefix: String,

    /// TCP port the plugs listen on
    #[arg(long, env = "TPLINK_DEVICE_PORT", default_value_t = DEFAULT_DEVICE_PORT)]
    pub device_port: u16,
}

impl Config {
    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidConfiguration`] naming the first bad
    /// option.
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.mqtt_host.trim().is_empty() {
            return Err(ValueError::InvalidConfiguration(
                "MQTT host must not be empty".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(ValueError::InvalidConfiguration(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        if self.interval == 0 {
            return Err(ValueError::InvalidConfiguration(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.mqtt_password.is_some() && self.mqtt_username.is_none() {
            return Err(ValueError::InvalidConfiguration(
                "MQTT password given without a username".to_string(),
            ));
        }
        for (name, topic) in [
            ("base topic", &self.base_topic),
            ("discovery prefix", &self.discovery_prefix),
        ] {
            if topic.is_empty() || topic.contains(['+', '#']) {
                return Err(ValueError::InvalidConfiguration(format!(
                    "{name} must be a non-empty topic without wildcards"
                )));
            }
        }
        Ok(())
    }

    /// Device request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Pause between poll cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// MQTT credentials, if a username was given.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.mqtt_username
            .as_deref()
            .map(|user| (user, self.mqtt_password.as_deref().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["tplink2mqtt"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--mqtt-host", "broker.local"]);
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.mqtt_client_id, "tplink2mqtt");
        assert_eq!(config.subnet.to_string(), "192.168.2.0/24");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.base_topic, "tplink2mqtt");
        assert_eq!(config.discovery_prefix, "homeassistant");
        assert_eq!(config.device_port, 9999);
        assert!(config.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--mqtt-host",
            "10.0.0.1",
            "--mqtt-username",
            "bridge",
            "--subnet",
            "10.0.0.0/22",
            "--interval",
            "10",
        ]);
        assert_eq!(config.credentials(), Some(("bridge", "")));
        assert_eq!(config.subnet.hosts().count(), 1022);
        assert_eq!(config.interval(), Duration::from_secs(10));
    }

    #[test]
    fn bad_subnet_is_a_parse_error() {
        let result = Config::try_parse_from(["tplink2mqtt", "--mqtt-host", "h", "--subnet", "10.0.0.0/8"]);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = parse(&["--mqtt-host", "h"]);
        config.interval = 0;
        assert!(matches!(
            config.validate(),
            Err(ValueError::InvalidConfiguration(_))
        ));

        let mut config = parse(&["--mqtt-host", " "]);
        assert!(config.validate().is_err());
        config.mqtt_host = "h".to_string();
        config.discovery_prefix = "home/#".to_string();
        assert!(config.validate().is_err());

        let config = parse(&["--mqtt-host", "h", "--mqtt-password", "secret"]);
        assert!(config.validate().is_err());
    }
}
