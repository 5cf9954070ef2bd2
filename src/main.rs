// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `tplink2mqtt` daemon.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tplink2mqtt::listener::HomeAssistantListenerOptions;
use tplink2mqtt::{
    Bridge, Config, HomeAssistantDestination, HomeAssistantListener, KasaSource, MqttBroker,
    StandardDestination,
};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let mut builder = MqttBroker::builder()
        .host(&config.mqtt_host)
        .port(config.mqtt_port)
        .client_id(&config.mqtt_client_id);
    if let Some((username, password)) = config.credentials() {
        builder = builder.credentials(username, password);
    }

    let broker = match builder.build().await {
        Ok(broker) => Arc::new(broker),
        Err(e) => {
            tracing::error!(
                host = %config.mqtt_host,
                port = config.mqtt_port,
                error = %e,
                "Failed to connect to MQTT broker"
            );
            return ExitCode::FAILURE;
        }
    };

    let plugs = Arc::new(KasaSource::new().with_port(config.device_port));
    let listener = HomeAssistantListener::new(
        broker.clone(),
        plugs.clone(),
        plugs.clone(),
        HomeAssistantListenerOptions {
            discovery_prefix: config.discovery_prefix.clone(),
            timeout: config.timeout(),
        },
    );

    let bridge = Arc::new(
        Bridge::builder(plugs)
            .subnet(config.subnet)
            .timeout(config.timeout())
            .interval(config.interval())
            .destination(Arc::new(StandardDestination::new(
                broker.clone(),
                config.base_topic.clone(),
            )))
            .destination(Arc::new(HomeAssistantDestination::new(
                broker.clone(),
                config.discovery_prefix.clone(),
            )))
            .listener(Arc::new(listener))
            .build(),
    );

    let status = broker.watch_status();
    let runner = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.run(status).await }
    });

    tracing::info!(subnet = %config.subnet, "tplink2mqtt running, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutting down");
    runner.abort();
    bridge.stop();
    if let Err(e) = broker.disconnect().await {
        tracing::warn!(error = %e, "Failed to disconnect cleanly");
    }

    ExitCode::SUCCESS
}
