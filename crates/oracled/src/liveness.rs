//! Liveness probe.
//!
//! `GET /api` answers with a fixed JSON acknowledgement. It reports that the
//! process is up and nothing else; it exposes no oracle state.

use std::future::Future;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

pub const LIVENESS_MESSAGE: &str = "Flight oracle bridge is running";

#[derive(Debug, Serialize)]
struct ApiInfo {
    message: &'static str,
}

pub fn router() -> Router {
    Router::new().route("/api", get(api_info))
}

async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: LIVENESS_MESSAGE,
    })
}

/// Serve the probe on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
}
