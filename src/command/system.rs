// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! System module commands: identity and relay control.

use serde_json::{Value, json};

use crate::command::Command;

/// Commands of the `system` module.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::command::{Command, SystemCommand};
///
/// let off = SystemCommand::off();
/// assert_eq!(off.method(), "set_relay_state");
/// assert_eq!(off.params()["state"], 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    /// Query identity, alias, model and relay state.
    GetSysInfo,
    /// Switch the relay on (`true`) or off (`false`).
    SetRelayState(bool),
}

impl SystemCommand {
    /// Creates a command to turn the relay on.
    #[must_use]
    pub const fn on() -> Self {
        Self::SetRelayState(true)
    }

    /// Creates a command to turn the relay off.
    #[must_use]
    pub const fn off() -> Self {
        Self::SetRelayState(false)
    }
}

impl Command for SystemCommand {
    fn module(&self) -> &'static str {
        "system"
    }

    fn method(&self) -> &'static str {
        match self {
            Self::GetSysInfo => "get_sysinfo",
            Self::SetRelayState(_) => "set_relay_state",
        }
    }

    fn params(&self) -> Value {
        match self {
            Self::GetSysInfo => json!({}),
            Self::SetRelayState(on) => json!({ "state": u8::from(*on) }),
        }
    }
}
