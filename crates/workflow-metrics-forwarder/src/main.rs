// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use workflow_metrics::{
    config::Config,
    driver::BatchDriver,
    fetcher::HttpWorkflowFetcher,
    http_utils::build_client,
    logger::Formatter,
    publisher::HttpMetricsSink,
    receiver::LogReceiver,
};

const RECEIVER_HOST: [u8; 4] = [0, 0, 0, 0];

#[tokio::main]
pub async fn main() {
    let config = Config::from_env();

    // A rejected configuration is still reported at the default level.
    init_logging(config.as_ref().map_or("info", |c| c.log_level.as_str()));

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on workflow metrics forwarder startup: {e}");
            return;
        }
    };

    let client = match build_client(config.https_proxy.as_deref(), config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to create HTTP client: {e}");
            return;
        }
    };

    let driver = BatchDriver::from_config(
        &config,
        Arc::new(HttpWorkflowFetcher::new(client.clone(), &config.workflow_api)),
        Arc::new(HttpMetricsSink::new(client, &config.metrics_sink)),
    );

    let cancel_token = CancellationToken::new();
    let receiver = LogReceiver::new(
        driver,
        config.max_request_content_length,
        cancel_token.clone(),
    );

    let addr = SocketAddr::from((RECEIVER_HOST, config.receiver_port));
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Unable to bind log receiver to {addr}: {e}");
            return;
        }
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                cancel_token.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    info!(
        "Forwarding workflow metrics for cluster {} to {}",
        config.cluster, config.metrics_sink.url
    );

    if let Err(e) = receiver.serve(listener).await {
        error!("Log receiver stopped with error: {e}");
    }
}

fn log_filter_directives(log_level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,{log_level}")
}

fn init_logging(log_level: &str) {
    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_filter_directives(log_level))
                .expect("could not parse log level in configuration"),
        )
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}
