// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TP-Link Kasa local protocol.
//!
//! Requests and replies are JSON documents framed as a 4-byte big-endian
//! length followed by the payload obfuscated with an XOR autokey cipher:
//! the key starts at 171 and each ciphertext byte becomes the key for the
//! next one. Every exchange uses a fresh TCP connection.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::command::Command;
use crate::error::{Error, ParseError, ProtocolError};
use crate::response::parse_reply;

/// TCP port smart plugs listen on.
pub const DEFAULT_DEVICE_PORT: u16 = 9999;

/// Initial key of the autokey cipher.
const INITIAL_KEY: u8 = 171;

/// Replies larger than this are treated as corrupt frames.
const MAX_FRAME_LEN: usize = 64 * 1024;

/// Obfuscates `plain` and prepends the length header.
///
/// # Examples
///
/// ```
/// use tplink2mqtt::protocol::{decrypt, encrypt};
///
/// let frame = encrypt(br#"{"system":{"get_sysinfo":{}}}"#);
/// assert_eq!(&frame[..4], &29u32.to_be_bytes());
/// assert_eq!(decrypt(&frame[4..]), br#"{"system":{"get_sysinfo":{}}}"#);
/// ```
#[must_use]
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    // Frames are bounded by MAX_FRAME_LEN in practice.
    #[allow(clippy::cast_possible_truncation)]
    let len = plain.len() as u32;

    let mut frame = Vec::with_capacity(plain.len() + 4);
    frame.extend_from_slice(&len.to_be_bytes());

    let mut key = INITIAL_KEY;
    for &byte in plain {
        key ^= byte;
        frame.push(key);
    }
    frame
}

/// Reverses the obfuscation of a frame body (without the length header).
#[must_use]
pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&byte| {
            let plain = key ^ byte;
            key = byte;
            plain
        })
        .collect()
}

/// Client for the Kasa local protocol.
///
/// The client holds no connection; each call connects, exchanges one frame
/// and disconnects, all within the supplied timeout.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tplink2mqtt::command::SystemCommand;
/// use tplink2mqtt::protocol::KasaClient;
/// use tplink2mqtt::response::SysInfoResponse;
///
/// # async fn example() -> tplink2mqtt::Result<()> {
/// let client = KasaClient::new();
/// let info: SysInfoResponse = client
///     .send_command("192.168.2.10", &SystemCommand::GetSysInfo, Duration::from_secs(5))
///     .await?;
/// println!("{} is {}", info.alias, if info.is_on() { "on" } else { "off" });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct KasaClient {
    port: u16,
}

impl Default for KasaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KasaClient {
    /// Creates a client for the default device port.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            port: DEFAULT_DEVICE_PORT,
        }
    }

    /// Sets a custom device port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the device port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Sends a command and parses the method object of the reply.
    ///
    /// # Errors
    ///
    /// Returns a protocol error on connect/IO failure or timeout, a parse
    /// error on a malformed reply, and a device error if the plug rejected
    /// the command.
    pub async fn send_command<C, T>(
        &self,
        address: &str,
        command: &C,
        timeout: Duration,
    ) -> Result<T, Error>
    where
        C: Command + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let reply = self.send_raw(address, &command.to_request(), timeout).await?;
        parse_reply(command, &reply)
    }

    /// Sends a raw request document and returns the raw reply document.
    ///
    /// # Errors
    ///
    /// Returns a protocol error on connect/IO failure or timeout, and a parse
    /// error if the reply is not a valid frame of JSON.
    pub async fn send_raw(
        &self,
        address: &str,
        request: &Value,
        timeout: Duration,
    ) -> Result<Value, Error> {
        let body = serde_json::to_vec(request).map_err(ParseError::Json)?;
        tracing::trace!(address = %address, request = %request, "Sending device request");

        // Safe: timeouts are seconds, far below u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;

        let plain = tokio::time::timeout(timeout, self.exchange(address, &body))
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))??;

        Ok(serde_json::from_slice(&plain).map_err(ParseError::Json)?)
    }

    async fn exchange(&self, address: &str, body: &[u8]) -> Result<Vec<u8>, Error> {
        let mut stream = TcpStream::connect((address, self.port))
            .await
            .map_err(ProtocolError::Io)?;

        stream
            .write_all(&encrypt(body))
            .await
            .map_err(ProtocolError::Io)?;

        let mut header = [0u8; 4];
        stream
            .read_exact(&mut header)
            .await
            .map_err(ProtocolError::Io)?;

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ParseError::UnexpectedFormat(format!(
                "reply frame of {len} bytes exceeds {MAX_FRAME_LEN}"
            ))
            .into());
        }

        let mut cipher = vec![0u8; len];
        stream
            .read_exact(&mut cipher)
            .await
            .map_err(ProtocolError::Io)?;

        Ok(decrypt(&cipher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SystemCommand;
    use crate::response::SysInfoResponse;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn cipher_known_vector() {
        // Leading bytes of the widely documented sysinfo probe
        let frame = encrypt(br#"{"system":{"get_sysinfo":null}}"#);
        assert_eq!(&frame[4..8], &[0xd0, 0xf2, 0x81, 0xf8]);
    }

    #[test]
    fn cipher_round_trips() {
        let plain = br#"{"emeter":{"get_realtime":{}}}"#;
        let frame = encrypt(plain);
        assert_eq!(decrypt(&frame[4..]), plain);
    }

    #[test]
    fn empty_payload_has_zero_length() {
        assert_eq!(encrypt(b""), vec![0, 0, 0, 0]);
    }

    async fn serve_once(reply: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 4];
            socket.read_exact(&mut header).await.unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
            socket.read_exact(&mut body).await.unwrap();
            socket.write_all(&reply).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn send_command_parses_reply() {
        let reply = json!({ "system": { "get_sysinfo": {
            "alias": "Lamp", "model": "HS100(UK)", "deviceId": "ABC", "relay_state": 1, "err_code": 0
        }}});
        let port = serve_once(encrypt(reply.to_string().as_bytes())).await;

        let client = KasaClient::new().with_port(port);
        let info: SysInfoResponse = client
            .send_command("127.0.0.1", &SystemCommand::GetSysInfo, Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(info.alias, "Lamp");
        assert!(info.is_on());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let port = serve_once(u32::MAX.to_be_bytes().to_vec()).await;

        let client = KasaClient::new().with_port(port);
        let err = client
            .send_raw("127.0.0.1", &json!({}), Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse(ParseError::UnexpectedFormat(_))));
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = KasaClient::new().with_port(port);
        let err = client
            .send_raw("127.0.0.1", &json!({}), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(200))));
    }
}
