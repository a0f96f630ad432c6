// src/handlers/status.rs - Connection status and probing
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::providers::ProviderKind;
use crate::AppState;

/// GET /api/status - synchronous projection for the status bar
pub async fn get_status(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.api_manager.connection_status()))
}

#[derive(Deserialize)]
pub struct ProbeRequest {
    /// Defaults to the active vendor.
    pub provider: Option<ProviderKind>,
}

/// POST /api/probe - one diagnostic round trip, structured pass/fail back
pub async fn probe(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ProbeRequest>,
) -> impl IntoResponse {
    let result = state.api_manager.test_connection(request.provider).await;
    (StatusCode::OK, Json(result))
}

pub fn status_routes() -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/probe", post(probe))
}
