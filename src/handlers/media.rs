// src/handlers/media.rs - Image analysis and video-spec endpoints. Both
// orchestrate remote calls and degrade to deterministic records, so they
// also always answer 200.
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    /// Base64 image payload, forwarded to the vision endpoint untouched.
    pub image_base64: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

/// POST /api/analyze/image
pub async fn analyze_image(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AnalyzeImageRequest>,
) -> impl IntoResponse {
    let analysis = state
        .api_manager
        .analyze_image(&request.image_base64, &request.mime_type)
        .await;
    (StatusCode::OK, Json(analysis))
}

#[derive(Deserialize)]
pub struct VideoSpecsRequest {
    pub prompt: String,
}

/// POST /api/preview/specs
pub async fn video_specs(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<VideoSpecsRequest>,
) -> impl IntoResponse {
    let specs = state.api_manager.generate_video_specs(&request.prompt).await;
    (StatusCode::OK, Json(specs))
}

pub fn media_routes() -> Router {
    Router::new()
        .route("/api/analyze/image", post(analyze_image))
        .route("/api/preview/specs", post(video_specs))
}
