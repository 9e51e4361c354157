use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::kernel::ServerDeps;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    channels: usize,
    pending_consent: usize,
}

/// Health check endpoint
///
/// Everything lives in memory, so the process answering is the health signal.
/// Reports the channel table size and the consent queue depth.
pub async fn health_handler(
    Extension(deps): Extension<ServerDeps>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            channels: deps.gateway.registry().len(),
            pending_consent: deps.consent_broker.list_pending().await.len(),
        }),
    )
}
