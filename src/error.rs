// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! This module provides the error hierarchy shared by every layer: value
//! validation, bus and device transport, reply parsing, and device-side
//! command failures.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during bus or device communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing or encoding a document.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The device answered but refused the request.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A command referenced a device id that is not known locally.
    #[error("unknown device: {0}")]
    DeviceNotFound(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A subnet string could not be parsed.
    #[error("invalid subnet: {0}")]
    InvalidSubnet(String),

    /// A subnet is larger than the discovery sweep allows.
    #[error("subnet /{prefix} is too large, the shortest accepted prefix is /{min}")]
    SubnetTooLarge {
        /// The requested prefix length.
        prefix: u8,
        /// The shortest accepted prefix length.
        min: u8,
    },

    /// A configuration value is missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors related to bus and device transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Socket-level failure talking to a device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection to the broker or device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The bus is currently disconnected.
    #[error("not connected")]
    NotConnected,
}

/// Errors related to parsing device replies and encoding bus documents.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the reply.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Reply frame did not have the expected shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors reported by the device itself.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device returned a non-zero `err_code`.
    #[error("command rejected ({code}): {message}")]
    CommandRejected {
        /// The device error code.
        code: i64,
        /// The device error message, if any.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
