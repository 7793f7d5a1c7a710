// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve`: wire storage, hub, sequencer, and gateway together.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{CourierError, PluginAdapter};
use courier_gateway::{GatewayState, HealthState, SessionSettings};
use courier_hub::Hub;
use courier_sequencer::Sequencer;
use courier_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Run the server until SIGINT/SIGTERM.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.log.level);
    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let prometheus_render = init_metrics(&config)?;

    let hub = Arc::new(Hub::new());
    let sequencer = Arc::new(Sequencer::new(
        store.clone(),
        hub.clone(),
        config.sequencer.clone(),
    ));

    let state = GatewayState {
        hub: hub.clone(),
        sequencer,
        identity: store.clone(),
        calls: store.clone(),
        session: SessionSettings::from(&config.session),
        health: HealthState::new(prometheus_render),
    };

    let cancel = shutdown::install_signal_handler();
    let served =
        courier_gateway::start_server(&config.server.host, config.server.port, state, cancel).await;

    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    served?;

    info!("courier serve shutdown complete");
    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics(config: &CourierConfig) -> Result<Option<MetricsRender>, CourierError> {
    if !config.metrics.enabled {
        info!("metrics disabled");
        return Ok(None);
    }
    let adapter = courier_prometheus::PrometheusAdapter::new()?;
    info!("prometheus metrics enabled at /metrics");
    Ok(Some(Arc::new(move || adapter.render())))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(config: &CourierConfig) -> Result<Option<MetricsRender>, CourierError> {
    if config.metrics.enabled {
        warn!("metrics enabled in config but the prometheus feature is not compiled in");
    }
    Ok(None)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    // A global subscriber may already exist, e.g. under tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
