// src/gemini_client.rs - Google Gemini generateContent client
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::{ProviderClient, ProviderError, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64 payload, passed through untouched.
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
    })
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            MODEL,
            urlencoding::encode(&self.api_key)
        )
    }

    /// Vision-capable entry point: callers supply the parts (text plus
    /// inline image data) and the generation config.
    pub async fn generate_with_parts(
        &self,
        parts: Vec<Part>,
        generation_config: GenerationConfig,
    ) -> Result<String, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::missing_key(ProviderKind::Google));
        }
        let request = GenerateContentRequest {
            contents: vec![Content { parts, role: None }],
            generation_config,
            safety_settings: default_safety_settings(),
        };
        self.post(&request).await
    }

    async fn post(&self, request: &GenerateContentRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("Gemini API returned {}", status);
            tracing::debug!("Gemini error body: {}", body);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| {
            content.parts.into_iter().find_map(|part| match part {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } => None,
            })
        })
        .ok_or_else(|| {
            ProviderError::MalformedResponse(
                "missing candidates[0].content.parts[0].text".to_string(),
            )
        })
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn probe(&self) -> Result<String, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::missing_key(ProviderKind::Google));
        }
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: "Test connection. Respond with \"Google Gemini connected successfully\""
                        .to_string(),
                }],
                role: None,
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 100,
                top_k: 40,
                top_p: 0.95,
            },
            safety_settings: default_safety_settings(),
        };
        self.post(&request).await?;
        Ok("Google Gemini connected successfully".to_string())
    }

    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::missing_key(ProviderKind::Google));
        }
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: format!("{}\n\n{}", system_prompt, user_prompt),
                }],
                role: None,
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
                top_k: 40,
                top_p: 0.8,
            },
            safety_settings: default_safety_settings(),
        };
        self.post(&request).await
    }
}
