// src/handlers/settings.rs - Settings CRUD and vendor management
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
use crate::settings::SettingsPatch;
use crate::AppState;

/// GET /api/settings - the full settings blob, as the single-user UI edits it
pub async fn get_settings(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.settings.load()))
}

/// PUT /api/settings - shallow top-level merge, returns the merged result
pub async fn update_settings(
    Extension(state): Extension<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    let merged = state.settings.save(patch);
    (StatusCode::OK, Json(merged))
}

#[derive(Deserialize)]
pub struct SwitchVendorRequest {
    pub vendor: ProviderKind,
}

/// POST /api/settings/vendor - persist the new default vendor, then probe it
pub async fn switch_vendor(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<SwitchVendorRequest>,
) -> impl IntoResponse {
    let result = state.api_manager.switch_vendor(request.vendor).await;
    (StatusCode::OK, Json(result))
}

/// GET /api/vendors - the catalog with per-vendor availability
pub async fn list_vendors(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.api_manager.vendor_overview()))
}

pub fn settings_routes() -> Router {
    Router::new()
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/vendor", post(switch_vendor))
        .route("/api/vendors", get(list_vendors))
}
