use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod anthropic_client;
mod api_manager;
mod gemini_client;
mod handlers;
mod middleware;
mod openai_client;
mod pipeline;
mod prompts;
mod providers;
mod settings;
mod trickle_client;

use api_manager::{ApiManager, ManagerConfig};
use providers::ProviderKind;
use settings::{SettingsPatch, SettingsStore, DEFAULT_SETTINGS_PATH};

// AppState holds the settings store and the API manager; handlers reach
// everything through these two.
pub struct AppState {
    pub settings: Arc<SettingsStore>,
    pub api_manager: ApiManager,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Open (or default) the persisted settings
    let settings_path =
        std::env::var("SETTINGS_PATH").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Arc::new(SettingsStore::open(&settings_path));
    tracing::info!("Settings loaded from {}", settings_path);

    // Seed the Gemini key from the environment when the settings file has
    // none yet; the settings store stays authoritative afterwards.
    if settings.load().api_key(ProviderKind::Google).is_empty() {
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.trim().is_empty() {
                tracing::info!("Seeding Google Gemini API key from environment");
                let mut api_keys = settings.load().api_keys;
                api_keys.insert(ProviderKind::Google, api_key);
                settings.save(SettingsPatch {
                    api_keys: Some(api_keys),
                    ..SettingsPatch::default()
                });
            }
        } else {
            tracing::warn!("GEMINI_API_KEY not set and no stored key. Google Gemini will fall back until configured.");
        }
    }

    // Endpoint overrides, mainly for the built-in agent sidecar
    let mut config = ManagerConfig::default();
    if let Ok(url) = std::env::var("TRICKLE_AGENT_URL") {
        tracing::info!("Using Trickle agent at {}", url);
        config.trickle_base_url = url;
    }
    match std::env::var("CUSTOM_API_URL") {
        Ok(url) if !url.trim().is_empty() => {
            tracing::info!("Custom API endpoint configured");
            config.custom_base_url = Some(url);
        }
        _ => {
            tracing::info!("Custom API endpoint not configured");
        }
    }

    let api_manager = ApiManager::new(settings.clone(), config);

    let shared_state = Arc::new(AppState {
        settings,
        api_manager,
    });

    // Build our application with all routes and shared state
    let app = Router::new()
        .merge(handlers::generate::generate_routes())
        .merge(handlers::media::media_routes())
        .merge(handlers::settings::settings_routes())
        .merge(handlers::status::status_routes())
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,prompt_studio=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,prompt_studio=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logging for production aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎬 Prompt Studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        }
    );

    Ok(())
}
