//! Public HTTP surface.
//!
//! Exposes a health check and the legacy `/instagram` relay endpoint.
//! Runs on WEB_PORT (default 3000) alongside the bot dispatcher.

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::error::AppError;

/// Body of a relay request posted by an external integration.
#[derive(Debug, Deserialize)]
struct InstagramRelayRequest {
    user_id: Option<String>,
    video_url: Option<String>,
}

/// Start the public web server.
pub async fn start_web_server(port: u16) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/instagram", post(instagram_handler));

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /health     - Health check");
    log::info!("  /instagram  - Instagram relay (POST)");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Acknowledge an external relay request.
///
/// Inbound Instagram media normally arrives through the DM poller; this
/// endpoint only acknowledges pushes from integrations that POST directly.
async fn instagram_handler(Json(req): Json<InstagramRelayRequest>) -> (StatusCode, &'static str) {
    log::info!(
        "Instagram relay request: user_id={:?}, video_url={:?}",
        req.user_id,
        req.video_url
    );
    (StatusCode::OK, "Video sent to Telegram!")
}
