use std::net::SocketAddr;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Liveness endpoint
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "resize-worker",
        })),
    )
}

/// Router serving `GET /health`
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Start the health check HTTP server
///
/// # Errors
///
/// Returns an error if `PORT` is not a valid port or the server fails to bind
pub async fn start_health_server(shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));
    let listener = TcpListener::bind(addr).await?;
    info!("Health check server listening on {}", addr);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    Ok(())
}
