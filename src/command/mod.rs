// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Smart-plug command definitions.
//!
//! Every command is a JSON object of the form
//! `{"<module>": {"<method>": <params>}}`. The device answers with the same
//! nesting, the method object carrying the result and an `err_code`.
//!
//! | Command | Module | Method |
//! |---------|--------|--------|
//! | [`SystemCommand::GetSysInfo`] | `system` | `get_sysinfo` |
//! | [`SystemCommand::SetRelayState`] | `system` | `set_relay_state` |
//! | [`EmeterCommand::GetRealtime`] | `emeter` | `get_realtime` |
//!
//! # Examples
//!
//! ```
//! use tplink2mqtt::command::{Command, SystemCommand};
//!
//! let cmd = SystemCommand::SetRelayState(true);
//! assert_eq!(
//!     cmd.to_request().to_string(),
//!     r#"{"system":{"set_relay_state":{"state":1}}}"#
//! );
//! ```

mod emeter;
mod system;

pub use emeter::EmeterCommand;
pub use system::SystemCommand;

use serde_json::{Map, Value};

/// A command that can be sent to a smart plug.
pub trait Command {
    /// Returns the module the command belongs to (e.g. `system`).
    fn module(&self) -> &'static str;

    /// Returns the method name within the module (e.g. `get_sysinfo`).
    fn method(&self) -> &'static str;

    /// Returns the method parameters. Queries take an empty object.
    fn params(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Returns the full request document.
    fn to_request(&self) -> Value {
        let mut method = Map::new();
        method.insert(self.method().to_string(), self.params());
        let mut module = Map::new();
        module.insert(self.module().to_string(), Value::Object(method));
        Value::Object(module)
    }
}
