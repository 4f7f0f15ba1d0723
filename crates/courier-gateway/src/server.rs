// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the REST API and the
//! broker bridge.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use courier_core::{Context, CourierError};
use courier_service::NotificationService;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::broker::BrokerRouter;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<NotificationService>,
    pub broker: BrokerRouter,
    /// Root token; every request context is a child of it.
    pub shutdown: CancellationToken,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(service: Arc<NotificationService>, shutdown: CancellationToken) -> Self {
        Self {
            broker: BrokerRouter::new(Arc::clone(&service)),
            service,
            shutdown,
            started: Instant::now(),
        }
    }

    /// Context for one request. Cancelled when the server shuts down.
    pub fn context(&self) -> Context {
        Context::from_token(self.shutdown.child_token())
    }
}

/// Gateway server configuration (mirrors GatewayConfig from courier-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full route table.
///
/// - POST/GET /v1/channels, GET/PATCH/DELETE /v1/channels/{id}
/// - POST/GET /v1/templates, GET/PATCH/DELETE /v1/templates/{id}
/// - POST/GET /v1/messages, GET /v1/messages/{id}
/// - POST /v1/rpc/{subject}
/// - GET /v1/channel-types, GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/channel-types", get(handlers::list_channel_types))
        .route(
            "/v1/channels",
            post(handlers::create_channel).get(handlers::list_channels),
        )
        .route(
            "/v1/channels/{id}",
            get(handlers::get_channel)
                .patch(handlers::update_channel)
                .delete(handlers::delete_channel),
        )
        .route(
            "/v1/templates",
            post(handlers::create_template).get(handlers::list_templates),
        )
        .route(
            "/v1/templates/{id}",
            get(handlers::get_template)
                .patch(handlers::update_template)
                .delete(handlers::delete_template),
        )
        .route(
            "/v1/messages",
            post(handlers::send_message).get(handlers::list_messages),
        )
        .route("/v1/messages/{id}", get(handlers::get_message))
        .route("/v1/rpc/{subject}", post(handlers::rpc))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds to `host:port` and serves until `state.shutdown` is cancelled.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), CourierError> {
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| CourierError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_test_utils::TestHarness;

    #[tokio::test]
    async fn request_context_follows_shutdown() {
        let harness = TestHarness::builder().build().await.unwrap();
        let token = CancellationToken::new();
        let state = GatewayState::new(harness.service(), token.clone());

        let ctx = state.context();
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn server_stops_on_shutdown() {
        let harness = TestHarness::builder().build().await.unwrap();
        let token = CancellationToken::new();
        let state = GatewayState::new(harness.service(), token.clone());
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        let handle = tokio::spawn(async move { start_server(&config, state).await });
        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        assert!(format!("{config:?}").contains("8080"));
    }
}
