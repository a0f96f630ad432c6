// src/handlers/generate.rs - Generation endpoints. Thin: deserialize,
// delegate to the ApiManager, serialize. Generation always answers 200;
// the source field tells the UI which tier produced the text.
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::pipeline::{GenerationOptions, SourceTier};
use crate::prompts::{self, ImageAnalysis, ImageToVideoPrefs};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub options: GenerationOptions,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub prompt: String,
    pub source: SourceTier,
}

/// POST /api/generate - raw core contract
pub async fn generate(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> impl IntoResponse {
    let outcome = state
        .api_manager
        .generate(&request.system_prompt, &request.user_prompt, &request.options)
        .await;
    (
        StatusCode::OK,
        Json(GenerateResponse {
            prompt: outcome.text,
            source: outcome.source,
        }),
    )
}

/// POST /api/prompts/video - build the prompt pair from the generator form
pub async fn generate_video_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Json(options): Json<GenerationOptions>,
) -> impl IntoResponse {
    let (system, user) = prompts::video_prompt_request(&options);
    let outcome = state.api_manager.generate(&system, &user, &options).await;
    (
        StatusCode::OK,
        Json(GenerateResponse {
            prompt: outcome.text,
            source: outcome.source,
        }),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageToVideoRequest {
    pub analysis: ImageAnalysis,
    #[serde(default)]
    pub prefs: ImageToVideoPrefs,
}

/// POST /api/prompts/image-to-video - animate a still image's analysis.
/// When every remote tier fails, the answer comes from the image-specific
/// template rather than the generic one, so the analysis still shows up.
pub async fn generate_image_to_video_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ImageToVideoRequest>,
) -> impl IntoResponse {
    let (system, user) = prompts::image_to_video_request(&request.analysis, &request.prefs);
    let options = GenerationOptions {
        topic: None,
        style: request.prefs.style.clone(),
        duration: request.prefs.duration.clone(),
        mood: request.prefs.mood.clone(),
        ..GenerationOptions::default()
    };
    let outcome = state.api_manager.generate(&system, &user, &options).await;
    let prompt = match outcome.source {
        SourceTier::LocalTemplate => {
            prompts::fallback_image_prompt(&request.analysis, &request.prefs)
        }
        _ => outcome.text,
    };
    (
        StatusCode::OK,
        Json(GenerateResponse {
            prompt,
            source: outcome.source,
        }),
    )
}

pub fn generate_routes() -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/prompts/video", post(generate_video_prompt))
        .route(
            "/api/prompts/image-to-video",
            post(generate_image_to_video_prompt),
        )
}
