// rest/mod.rs — HTTP API server.
//
// Axum server bridging the browser client to the inbox service and the
// store. The realtime channel is the latency optimization; these routes are
// the source of truth the client periodically reconciles against.
//
// Endpoints:
//   POST  /api/email/generate
//   POST  /api/email/generate-sso
//   GET   /api/email/{address}/messages
//   PATCH /api/messages/{id}/read
//   POST  /api/simulate/receive
//   GET   /health

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.rest_port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no payload)
        .route("/health", get(routes::health::health))
        // Address generation
        .route("/api/email/generate", post(routes::email::generate))
        .route("/api/email/generate-sso", post(routes::email::generate_sso))
        // Inbox polling
        .route(
            "/api/email/{address}/messages",
            get(routes::email::list_messages),
        )
        // Read acknowledgement
        .route("/api/messages/{id}/read", patch(routes::messages::mark_read))
        // Dev/test entry point
        .route("/api/simulate/receive", post(routes::simulate::receive))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
