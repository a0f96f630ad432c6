// src/openai_client.rs - OpenAI-compatible chat completions client.
// Also backs the "custom" vendor, which points at any endpoint speaking
// the same wire format.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::{ProviderClient, ProviderError, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    kind: ProviderKind,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            kind: ProviderKind::OpenAi,
        }
    }

    /// A user-supplied endpoint speaking the chat-completions format.
    pub fn custom(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            kind: ProviderKind::Custom,
        }
    }

    fn check_configured(&self) -> Result<(), ProviderError> {
        if self.kind == ProviderKind::Custom && self.base_url.trim().is_empty() {
            return Err(ProviderError::MissingCredential(
                "Custom API endpoint not configured".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::missing_key(self.kind));
        }
        Ok(())
    }

    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: MODEL.to_string(),
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("{} API returned {}", self.kind.label(), status);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "missing choices[0].message.content".to_string(),
                )
            })
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn probe(&self) -> Result<String, ProviderError> {
        self.check_configured()?;
        let messages = vec![ChatMessage {
            role: "user",
            content: format!(
                "Test connection. Respond with \"{} connected successfully\"",
                self.kind.label()
            ),
        }];
        self.chat(messages, 50).await?;
        Ok(format!("{} connected successfully", self.kind.label()))
    }

    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.check_configured()?;
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt.to_string(),
            },
        ];
        self.chat(messages, 1000).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn call_sends_bearer_token_and_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Generated" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("sk-test".to_string(), server.uri());
        assert_eq!(client.call("sys", "user").await.unwrap(), "Generated");
    }

    #[tokio::test]
    async fn custom_vendor_without_endpoint_fails_fast() {
        let client = OpenAiClient::custom("key".to_string(), String::new());
        let err = client.probe().await.unwrap_err();
        assert_eq!(err.to_string(), "Custom API endpoint not configured");
    }

    #[tokio::test]
    async fn missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("sk-test".to_string(), server.uri());
        let err = client.call("sys", "user").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
