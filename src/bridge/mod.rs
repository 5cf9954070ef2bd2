// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge engine.
//!
//! [`Bridge`] owns the poll loop and the table of known devices. Every cycle
//! it sweeps the subnet through its [`DeviceSource`], compares each snapshot
//! with the stored one, and pushes new or changed snapshots through every
//! [`Destination`] and then every [`Listener`], in the order they were
//! added. A failing destination or listener is logged and skipped.
//!
//! Listeners re-enter the same dispatch path when a command changes a
//! device, so the refreshed state is published without waiting for the next
//! cycle.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tplink2mqtt::bridge::Bridge;
//! use tplink2mqtt::destination::StandardDestination;
//! use tplink2mqtt::protocol::MqttBroker;
//! use tplink2mqtt::source::KasaSource;
//!
//! # async fn example() -> tplink2mqtt::Result<()> {
//! let broker = Arc::new(MqttBroker::builder().host("192.168.1.50").build().await?);
//!
//! let bridge = Arc::new(
//!     Bridge::builder(Arc::new(KasaSource::new()))
//!         .subnet("192.168.2.0/24".parse()?)
//!         .interval(Duration::from_secs(30))
//!         .destination(Arc::new(StandardDestination::new(broker.clone(), "tplink2mqtt")))
//!         .build(),
//! );
//!
//! bridge.run(broker.watch_status()).await;
//! # Ok(())
//! # }
//! ```

mod device_table;
mod dispatcher;

pub use device_table::DeviceTable;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::destination::Destination;
use crate::error::Result;
use crate::listener::Listener;
use crate::protocol::ConnectionStatus;
use crate::snapshot::DeviceSnapshot;
use crate::source::{DeviceSource, Subnet};

use dispatcher::Dispatcher;

/// Default discovery and command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between poll cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Poll settings.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Subnet swept each cycle.
    pub subnet: Subnet,
    /// Per-request timeout during discovery.
    pub timeout: Duration,
    /// Pause between cycles.
    pub interval: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            subnet: Subnet::default(),
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Builder for [`Bridge`].
pub struct BridgeBuilder {
    source: Arc<dyn DeviceSource>,
    options: BridgeOptions,
    destinations: Vec<Arc<dyn Destination>>,
    listeners: Vec<Arc<dyn Listener>>,
}

impl BridgeBuilder {
    /// Sets the subnet to sweep (default: `192.168.2.0/24`).
    #[must_use]
    pub fn subnet(mut self, subnet: Subnet) -> Self {
        self.options.subnet = subnet;
        self
    }

    /// Sets the discovery timeout (default: 5 seconds).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Sets the poll interval (default: 30 seconds).
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Appends a destination. Destinations run in the order added.
    #[must_use]
    pub fn destination(mut self, destination: Arc<dyn Destination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Appends a listener. Listeners run in the order added, after every
    /// destination.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the bridge. The poll loop starts on the first connect.
    #[must_use]
    pub fn build(self) -> Bridge {
        Bridge {
            inner: Arc::new(BridgeInner {
                options: self.options,
                source: self.source,
                dispatcher: Dispatcher::new(self.destinations, self.listeners),
                stopped: AtomicBool::new(true),
                wake: Notify::new(),
            }),
            poll_task: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("options", &self.options)
            .field("destinations", &self.destinations.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// The poll-and-dispatch engine.
pub struct Bridge {
    inner: Arc<BridgeInner>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

struct BridgeInner {
    options: BridgeOptions,
    source: Arc<dyn DeviceSource>,
    dispatcher: Arc<Dispatcher>,
    /// Set while the bus is disconnected; cycles are skipped.
    stopped: AtomicBool,
    /// Wakes the poll loop early after a reconnect.
    wake: Notify,
}

impl Bridge {
    /// Starts building a bridge around `source`.
    #[must_use]
    pub fn builder(source: Arc<dyn DeviceSource>) -> BridgeBuilder {
        BridgeBuilder {
            source,
            options: BridgeOptions::default(),
            destinations: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Returns the poll settings.
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Returns a copy of every known device, ordered by id.
    #[must_use]
    pub fn known_devices(&self) -> Vec<DeviceSnapshot> {
        self.inner.dispatcher.table().snapshots()
    }

    /// Returns `true` while cycles are being skipped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Runs one discover-compare-dispatch cycle.
    ///
    /// Returns the number of devices that were dispatched.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; nothing is dispatched in that case.
    pub async fn poll_once(&self) -> Result<usize> {
        self.inner.poll_once().await
    }

    // =========================================================================
    // Bus lifecycle
    // =========================================================================

    /// Resumes polling and starts the poll loop if it is not running.
    ///
    /// A running loop is woken so a cycle runs right away.
    pub fn on_bus_connected(&self) {
        self.inner.stopped.store(false, Ordering::Release);

        let mut task = self.poll_task.lock();
        match task.as_ref() {
            Some(handle) if !handle.is_finished() => {
                tracing::debug!("Waking poll loop");
                self.inner.wake.notify_one();
            }
            _ => {
                tracing::info!(
                    subnet = %self.inner.options.subnet,
                    interval_secs = self.inner.options.interval.as_secs(),
                    "Starting poll loop"
                );
                let inner = Arc::clone(&self.inner);
                *task = Some(tokio::spawn(async move { inner.poll_loop().await }));
            }
        }
    }

    /// Suspends polling until the next connect.
    pub fn on_bus_disconnected(&self, reason: &str) {
        self.inner.stopped.store(true, Ordering::Release);
        tracing::warn!(reason = %reason, "Bus disconnected, pausing polls");
    }

    /// Follows bus connection status until the sender is dropped.
    pub async fn run(&self, mut status: watch::Receiver<ConnectionStatus>) {
        let mut last: Option<ConnectionStatus> = None;
        loop {
            let current = status.borrow_and_update().clone();
            if last.as_ref() != Some(&current) {
                match &current {
                    ConnectionStatus::Connected => self.on_bus_connected(),
                    ConnectionStatus::Disconnected(reason) => self.on_bus_disconnected(reason),
                    ConnectionStatus::Connecting => {}
                }
                last = Some(current);
            }

            if status.changed().await.is_err() {
                tracing::debug!("Status channel closed");
                break;
            }
        }
    }

    /// Stops the poll loop.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
            tracing::info!("Poll loop stopped");
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(handle) = self.poll_task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("options", &self.inner.options)
            .field("known_devices", &self.inner.dispatcher.table().len())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl BridgeInner {
    async fn poll_once(&self) -> Result<usize> {
        let snapshots = self
            .source
            .discover_all(&self.options.subnet, self.options.timeout)
            .await?;
        tracing::debug!(count = snapshots.len(), "Discovery returned devices");

        let mut dispatched = 0;
        for snapshot in &snapshots {
            if self.dispatcher.table().observe(snapshot) {
                tracing::info!(device = %snapshot.id, name = %snapshot.info.friendly_name, "Device changed");
                self.dispatcher.dispatch(snapshot).await;
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    async fn poll_loop(&self) {
        loop {
            if self.stopped.load(Ordering::Acquire) {
                tracing::debug!("Bus disconnected, skipping cycle");
            } else if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "Failed to discover devices");
            }

            tokio::select! {
                () = tokio::time::sleep(self.options.interval) => {}
                () = self.wake.notified() => {}
            }
        }
    }
}
