// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kasa smart-plug source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::command::{EmeterCommand, SystemCommand};
use crate::error::{DeviceError, Error, ProtocolError, Result};
use crate::protocol::KasaClient;
use crate::response::{Acknowledgement, RealtimeResponse, SysInfoResponse};
use crate::snapshot::DeviceSnapshot;

use super::{DeviceControl, DeviceSource, Subnet};

/// Default number of hosts probed at the same time.
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 64;

/// Discovers, reads and switches Kasa plugs.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tplink2mqtt::source::{DeviceSource, KasaSource, Subnet};
///
/// # async fn example() -> tplink2mqtt::Result<()> {
/// let source = KasaSource::new();
/// let subnet: Subnet = "192.168.2.0/24".parse()?;
///
/// for snapshot in source.discover_all(&subnet, Duration::from_secs(5)).await? {
///     println!("{} at {}", snapshot.info.friendly_name, snapshot.info.network_address);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KasaSource {
    client: KasaClient,
    max_concurrent: usize,
}

impl Default for KasaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KasaSource {
    /// Creates a source using the default device port.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: KasaClient::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }

    /// Uses a custom device port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.client = self.client.with_port(port);
        self
    }

    /// Limits how many hosts are probed at once. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Returns the underlying protocol client.
    #[must_use]
    pub fn client(&self) -> &KasaClient {
        &self.client
    }
}

/// Reads sysinfo and, when available, the meter of one plug.
///
/// Both requests share `deadline`; the meter read only gets what the sysinfo
/// read left over.
async fn collect(client: KasaClient, address: &str, deadline: Instant) -> Result<DeviceSnapshot> {
    let info: SysInfoResponse = client
        .send_command(address, &SystemCommand::GetSysInfo, remaining(deadline))
        .await?;
    let mut builder = info.to_snapshot(address);

    let meter: Result<RealtimeResponse> = client
        .send_command(address, &EmeterCommand::GetRealtime, remaining(deadline))
        .await;
    match meter.and_then(|m| m.reading().map_err(Error::from)) {
        Ok(reading) => builder = builder.meter(reading),
        Err(Error::Device(DeviceError::CommandRejected { code, message })) => {
            tracing::debug!(address = %address, code, message = %message, "Device has no power meter");
        }
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "Failed to read power meter");
        }
    }

    Ok(builder.build())
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[async_trait]
impl DeviceSource for KasaSource {
    async fn discover_all(
        &self,
        subnet: &Subnet,
        timeout: Duration,
    ) -> Result<Vec<DeviceSnapshot>> {
        tracing::debug!(subnet = %subnet, timeout_ms = timeout.as_millis(), "Sweeping subnet");

        // One deadline for the whole sweep, queued hosts included.
        let deadline = Instant::now() + timeout;
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut probes = JoinSet::new();

        for host in subnet.hosts() {
            let permits = Arc::clone(&permits);
            let client = self.client;
            probes.spawn(async move {
                let probe = async move {
                    let address = host.to_string();
                    let _permit = permits.acquire_owned().await.ok()?;
                    match collect(client, &address, deadline).await {
                        Ok(snapshot) => Some((host, snapshot)),
                        Err(e) => {
                            tracing::trace!(address = %address, error = %e, "No device answered");
                            None
                        }
                    }
                };
                match tokio::time::timeout_at(deadline, probe).await {
                    Ok(found) => found,
                    Err(_) => {
                        tracing::trace!(address = %host, "Sweep deadline reached before host answered");
                        None
                    }
                }
            });
        }

        let mut found = Vec::new();
        while let Some(joined) = probes.join_next().await {
            let probe = joined.map_err(|e| {
                ProtocolError::ConnectionFailed(format!("discovery probe aborted: {e}"))
            })?;
            found.extend(probe);
        }
        found.sort_by_key(|(host, _)| *host);

        tracing::debug!(subnet = %subnet, count = found.len(), "Subnet sweep completed");
        Ok(found.into_iter().map(|(_, snapshot)| snapshot).collect())
    }

    async fn collect_one(&self, address: &str, timeout: Duration) -> Result<DeviceSnapshot> {
        collect(self.client, address, Instant::now() + timeout).await
    }
}

#[async_trait]
impl DeviceControl for KasaSource {
    async fn set_power(&self, address: &str, on: bool, timeout: Duration) -> Result<()> {
        tracing::debug!(address = %address, on, "Switching relay");
        let _: Acknowledgement = self
            .client
            .send_command(address, &SystemCommand::SetRelayState(on), timeout)
            .await?;
        Ok(())
    }
}
