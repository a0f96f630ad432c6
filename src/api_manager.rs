// src/api_manager.rs - The provider-abstraction facade. Owns the wiring
// between settings, the vendor catalog, the per-vendor clients, and the
// generation pipeline. Handlers talk to this and nothing deeper.
use serde::Serialize;
use std::sync::Arc;

use crate::anthropic_client::{self, AnthropicClient};
use crate::gemini_client::{self, GeminiClient, GenerationConfig, InlineData, Part};
use crate::openai_client::{self, OpenAiClient};
use crate::pipeline::{GenerationOptions, GenerationOutcome, GenerationPipeline, SourceTier};
use crate::prompts::{self, ImageAnalysis, VideoSpecs};
use crate::providers::{
    all_vendors, vendor_info, ConnectionTracker, ProbeResult, ProviderClient, ProviderKind,
};
use crate::settings::{Settings, SettingsPatch, SettingsStore};
use crate::trickle_client::{self, TrickleClient};

/// Endpoint configuration, resolved once at startup. Tests point the base
/// URLs at local mock servers.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub trickle_base_url: String,
    pub custom_base_url: Option<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: gemini_client::DEFAULT_BASE_URL.to_string(),
            openai_base_url: openai_client::DEFAULT_BASE_URL.to_string(),
            anthropic_base_url: anthropic_client::DEFAULT_BASE_URL.to_string(),
            trickle_base_url: trickle_client::DEFAULT_BASE_URL.to_string(),
            custom_base_url: None,
        }
    }
}

/// UI-facing connection summary, recomputed on demand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub active_provider: ProviderKind,
    pub provider_label: String,
}

/// One catalog row plus its current availability, for the vendor picker.
#[derive(Debug, Clone, Serialize)]
pub struct VendorStatus {
    pub id: ProviderKind,
    pub name: &'static str,
    pub external: bool,
    pub requires_key: bool,
    pub recommended: bool,
    pub status: &'static str,
}

pub struct ApiManager {
    settings: Arc<SettingsStore>,
    tracker: Arc<ConnectionTracker>,
    config: ManagerConfig,
}

impl ApiManager {
    pub fn new(settings: Arc<SettingsStore>, config: ManagerConfig) -> Self {
        Self {
            settings,
            tracker: Arc::new(ConnectionTracker::new()),
            config,
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    fn client_for(&self, settings: &Settings, kind: ProviderKind) -> Arc<dyn ProviderClient> {
        let key = settings.api_key(kind);
        match kind {
            ProviderKind::Trickle => {
                Arc::new(TrickleClient::new(self.config.trickle_base_url.clone()))
            }
            ProviderKind::Google => Arc::new(GeminiClient::with_base_url(
                key,
                self.config.gemini_base_url.clone(),
            )),
            ProviderKind::OpenAi => Arc::new(OpenAiClient::with_base_url(
                key,
                self.config.openai_base_url.clone(),
            )),
            ProviderKind::Anthropic => Arc::new(AnthropicClient::with_base_url(
                key,
                self.config.anthropic_base_url.clone(),
            )),
            ProviderKind::Custom => Arc::new(OpenAiClient::custom(
                key,
                self.config.custom_base_url.clone().unwrap_or_default(),
            )),
        }
    }

    /// The core contract: always resolves to text, whatever the providers
    /// are doing. Credentials are read once, here, per run.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationOutcome {
        let settings = self.settings.load();
        let primary = self.client_for(&settings, settings.default_vendor);
        let fallback = Arc::new(TrickleClient::new(self.config.trickle_base_url.clone()));
        let pipeline = GenerationPipeline::new(primary, fallback, self.tracker.clone());
        pipeline.generate(system_prompt, user_prompt, options).await
    }

    /// One cheap round trip to the given vendor (or the active one).
    /// Key-requiring vendors with no key fail here without any network I/O.
    pub async fn test_connection(&self, vendor: Option<ProviderKind>) -> ProbeResult {
        let settings = self.settings.load();
        let kind = vendor.unwrap_or(settings.default_vendor);
        let client = self.client_for(&settings, kind);
        match client.probe().await {
            Ok(message) => {
                self.tracker.mark(kind, true);
                ProbeResult {
                    success: true,
                    message,
                }
            }
            Err(e) => {
                self.tracker.mark(kind, false);
                ProbeResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Synchronous projection for the status bar.
    pub fn connection_status(&self) -> ConnectionStatus {
        let settings = self.settings.load();
        let active = settings.default_vendor;
        ConnectionStatus {
            is_connected: self.tracker.is_connected(active),
            active_provider: active,
            provider_label: vendor_info(active).name.to_string(),
        }
    }

    /// Persists the new default vendor, then probes it.
    pub async fn switch_vendor(&self, vendor: ProviderKind) -> ProbeResult {
        self.settings.save(SettingsPatch {
            default_vendor: Some(vendor),
            ..SettingsPatch::default()
        });
        self.test_connection(Some(vendor)).await
    }

    /// Catalog rows for the vendor picker, with availability the way the
    /// status bar presents it.
    pub fn vendor_overview(&self) -> Vec<VendorStatus> {
        all_vendors()
            .into_iter()
            .map(|info| {
                let status = match info.id {
                    ProviderKind::Trickle => {
                        if self.tracker.is_connected(ProviderKind::Trickle) {
                            "connected"
                        } else {
                            "available"
                        }
                    }
                    ProviderKind::Custom => "configurable",
                    _ => "available",
                };
                VendorStatus {
                    id: info.id,
                    name: info.name,
                    external: info.external,
                    requires_key: info.requires_key,
                    recommended: info.recommended,
                    status,
                }
            })
            .collect()
    }

    /// Sends the image inline to Gemini vision and parses the analysis.
    /// Every failure path lands on the fixed fallback record.
    pub async fn analyze_image(&self, image_base64: &str, mime_type: &str) -> ImageAnalysis {
        let settings = self.settings.load();
        let key = settings.api_key(ProviderKind::Google);
        if key.trim().is_empty() {
            tracing::warn!("image analysis requested without a Gemini key, using basic analysis");
            return prompts::fallback_image_analysis();
        }

        let client = GeminiClient::with_base_url(key, self.config.gemini_base_url.clone());
        let parts = vec![
            Part::Text {
                text: prompts::IMAGE_ANALYSIS_SYSTEM.to_string(),
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.to_string(),
                    data: image_base64.to_string(),
                },
            },
        ];
        let config = GenerationConfig {
            temperature: 0.7,
            max_output_tokens: 1024,
            top_k: 40,
            top_p: 0.8,
        };

        match client.generate_with_parts(parts, config).await {
            Ok(text) => prompts::parse_image_analysis(&text),
            Err(e) => {
                tracing::warn!("image analysis failed ({}), using basic analysis", e);
                prompts::fallback_image_analysis()
            }
        }
    }

    /// Runs the spec request through the full pipeline and parses the JSON
    /// answer, degrading to the deterministic record.
    pub async fn generate_video_specs(&self, prompt: &str) -> VideoSpecs {
        let (system, user) = prompts::video_specs_request(prompt);
        let outcome = self
            .generate(&system, &user, &GenerationOptions::default())
            .await;
        match outcome.source {
            SourceTier::LocalTemplate => prompts::fallback_video_specs(prompt),
            _ => prompts::parse_video_specs(&outcome.text, prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_with(config: ManagerConfig) -> (ApiManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Arc::new(SettingsStore::open(dir.path().join("settings.json")));
        (ApiManager::new(settings, config), dir)
    }

    #[tokio::test]
    async fn probe_without_key_skips_the_network() {
        let (manager, _dir) = manager_with(ManagerConfig::default());
        let result = manager.test_connection(Some(ProviderKind::Google)).await;
        assert!(!result.success);
        assert_eq!(result.message, "Google Gemini API key required");
    }

    #[tokio::test]
    async fn status_defaults_to_disconnected_google() {
        let (manager, _dir) = manager_with(ManagerConfig::default());
        let status = manager.connection_status();
        assert!(!status.is_connected);
        assert_eq!(status.active_provider, ProviderKind::Google);
        assert_eq!(status.provider_label, "Google Gemini");
    }

    #[tokio::test]
    async fn switch_vendor_persists_and_probes() {
        let trickle = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoke"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "text": "Connection successful" })),
            )
            .expect(1)
            .mount(&trickle)
            .await;

        let config = ManagerConfig {
            trickle_base_url: trickle.uri(),
            ..ManagerConfig::default()
        };
        let (manager, _dir) = manager_with(config);

        let result = manager.switch_vendor(ProviderKind::Trickle).await;
        assert!(result.success);
        assert_eq!(result.message, "Trickle AI connected successfully");

        let status = manager.connection_status();
        assert!(status.is_connected);
        assert_eq!(status.active_provider, ProviderKind::Trickle);
        assert_eq!(status.provider_label, "Trickle AI (Built-in)");
        assert_eq!(
            manager.settings().load().default_vendor,
            ProviderKind::Trickle
        );
    }

    #[tokio::test]
    async fn failed_probe_marks_vendor_disconnected() {
        let trickle = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoke"))
            .respond_with(ResponseTemplate::new(500).set_body_string("agent down"))
            .mount(&trickle)
            .await;

        let config = ManagerConfig {
            trickle_base_url: trickle.uri(),
            ..ManagerConfig::default()
        };
        let (manager, _dir) = manager_with(config);

        let result = manager.test_connection(Some(ProviderKind::Trickle)).await;
        assert!(!result.success);
        assert!(result.message.contains("500"));

        let overview = manager.vendor_overview();
        let trickle_row = overview
            .iter()
            .find(|v| v.id == ProviderKind::Trickle)
            .unwrap();
        assert_eq!(trickle_row.status, "available");
    }

    #[tokio::test]
    async fn vendor_overview_covers_the_whole_catalog() {
        let (manager, _dir) = manager_with(ManagerConfig::default());
        let overview = manager.vendor_overview();
        assert_eq!(overview.len(), 5);
        let custom = overview
            .iter()
            .find(|v| v.id == ProviderKind::Custom)
            .unwrap();
        assert_eq!(custom.status, "configurable");
    }

    #[tokio::test]
    async fn image_analysis_without_key_uses_basic_record() {
        let (manager, _dir) = manager_with(ManagerConfig::default());
        let analysis = manager.analyze_image("aGVsbG8=", "image/jpeg").await;
        assert_eq!(analysis, prompts::fallback_image_analysis());
    }
}
