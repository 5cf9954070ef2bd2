// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy meter commands.

use crate::command::Command;

/// Commands of the `emeter` module.
///
/// Only metering plugs (e.g. HS110) implement this module; others reply with
/// a non-zero `err_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmeterCommand {
    /// Query instantaneous voltage, current and power.
    GetRealtime,
}

impl Command for EmeterCommand {
    fn module(&self) -> &'static str {
        "emeter"
    }

    fn method(&self) -> &'static str {
        match self {
            Self::GetRealtime => "get_realtime",
        }
    }
}
