// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use courier_core::{CallLookup, CourierError, IdentityResolver};
use courier_hub::Hub;
use courier_sequencer::Sequencer;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::session::SessionSettings;
use crate::ws;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Arc<Hub>,
    pub sequencer: Arc<Sequencer>,
    pub identity: Arc<dyn IdentityResolver>,
    pub calls: Arc<dyn CallLookup>,
    /// Limits applied to every live session.
    pub session: SessionSettings,
    pub health: HealthState,
}

/// Assemble the full router.
///
/// - GET /health, GET /metrics (public)
/// - /v1/* (bearer auth via middleware)
/// - GET /ws (auth during the handshake)
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages", post(handlers::post_message))
        .route(
            "/v1/messages/{id}",
            get(handlers::get_message).patch(handlers::patch_message),
        )
        .route("/v1/messages/delete", post(handlers::post_delete))
        .route("/v1/messages/forward", post(handlers::post_forward))
        .route("/v1/history", get(handlers::get_history))
        .route(
            "/v1/dialogs",
            get(handlers::get_dialogs).patch(handlers::patch_dialog),
        )
        .route("/v1/read", post(handlers::post_read))
        .route("/v1/presence", get(handlers::get_online_users))
        .route("/v1/presence/{user_id}", get(handlers::get_presence))
        .route_layer(axum_middleware::from_fn_with_state(
            state.identity.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `host:port` and serve until `shutdown` fires.
///
/// On shutdown every live session is closed before in-flight HTTP requests
/// are drained.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), CourierError> {
    let hub = state.hub.clone();
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            let closed = hub.close_all();
            info!(sessions = closed, "closing live sessions");
        })
        .await
        .map_err(|e| CourierError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<GatewayState>();
    }

    #[test]
    fn health_state_without_metrics() {
        let health = HealthState::new(None);
        assert!(health.prometheus_render.is_none());
        assert!(health.start_time.elapsed().as_secs() < 5);
    }
}
