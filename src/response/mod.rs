// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for smart-plug replies.
//!
//! A reply mirrors the request nesting. Errors can be reported at module
//! level (`{"emeter":{"err_code":-1,"err_msg":"module not support"}}`) or at
//! method level (`{"system":{"set_relay_state":{"err_code":-3}}}`); both are
//! turned into [`DeviceError::CommandRejected`].

mod emeter;
mod sysinfo;

pub use emeter::RealtimeResponse;
pub use sysinfo::SysInfoResponse;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::command::Command;
use crate::error::{DeviceError, Error, ParseError};

/// Extracts and deserializes the method object of a reply to `command`.
///
/// # Errors
///
/// Returns [`DeviceError::CommandRejected`] if the device reported a non-zero
/// `err_code`, or a [`ParseError`] if the reply is not shaped as expected.
pub fn parse_reply<C, T>(command: &C, reply: &Value) -> Result<T, Error>
where
    C: Command + ?Sized,
    T: DeserializeOwned,
{
    let module = reply
        .get(command.module())
        .ok_or_else(|| ParseError::MissingField(command.module().to_string()))?;
    check_err_code(module)?;

    let method = module
        .get(command.method())
        .ok_or_else(|| ParseError::MissingField(command.method().to_string()))?;
    check_err_code(method)?;

    Ok(serde_json::from_value(method.clone()).map_err(ParseError::Json)?)
}

fn check_err_code(object: &Value) -> Result<(), DeviceError> {
    match object.get("err_code").and_then(Value::as_i64) {
        Some(code) if code != 0 => Err(DeviceError::CommandRejected {
            code,
            message: object
                .get("err_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(()),
    }
}

/// Reply to a command that returns nothing but its status.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Acknowledgement {
    /// Always `0` once [`parse_reply`] succeeded.
    #[serde(default)]
    pub err_code: i64,
}
