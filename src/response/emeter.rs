// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `get_realtime` reply parsing.

use serde::Deserialize;

use crate::error::ParseError;
use crate::snapshot::MeterReading;

/// Instantaneous meter reply.
///
/// Older firmware reports `voltage`/`current`/`power` in V/A/W, newer
/// firmware `voltage_mv`/`current_ma`/`power_mw`. Both are accepted.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::response::RealtimeResponse;
///
/// let v1: RealtimeResponse =
///     serde_json::from_str(r#"{"voltage":230.5,"current":0.5,"power":115.2}"#).unwrap();
/// let v2: RealtimeResponse =
///     serde_json::from_str(r#"{"voltage_mv":230500,"current_ma":500,"power_mw":115200}"#)
///         .unwrap();
///
/// assert_eq!(v1.reading().unwrap(), v2.reading().unwrap());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeResponse {
    voltage: Option<f64>,
    current: Option<f64>,
    power: Option<f64>,
    voltage_mv: Option<f64>,
    current_ma: Option<f64>,
    power_mw: Option<f64>,
}

impl RealtimeResponse {
    /// Normalizes the reply to V/A/W.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingField`] if a quantity is absent in both
    /// dialects.
    pub fn reading(&self) -> Result<MeterReading, ParseError> {
        Ok(MeterReading {
            voltage: pick(self.voltage, self.voltage_mv, "voltage")?,
            current: pick(self.current, self.current_ma, "current")?,
            power: pick(self.power, self.power_mw, "power")?,
        })
    }
}

// Meter readings are small values where f32 precision is ample.
#[allow(clippy::cast_possible_truncation)]
fn pick(base: Option<f64>, milli: Option<f64>, field: &str) -> Result<f32, ParseError> {
    base.or_else(|| milli.map(|m| m / 1000.0))
        .map(|v| v as f32)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))
}
