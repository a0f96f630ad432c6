// src/anthropic_client.rs - Anthropic Messages API client
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::{ProviderClient, ProviderError, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl AnthropicClient {
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

    async fn messages(
        &self,
        system: Option<String>,
        user: String,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let request = MessagesRequest {
            model: MODEL.to_string(),
            max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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
            tracing::warn!("Anthropic API returned {}", status);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| {
                ProviderError::MalformedResponse("no text content in response".to_string())
            })
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn probe(&self) -> Result<String, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::missing_key(ProviderKind::Anthropic));
        }
        self.messages(
            None,
            "Test connection. Respond with \"Anthropic Claude connected successfully\""
                .to_string(),
            50,
        )
        .await?;
        Ok("Anthropic Claude connected successfully".to_string())
    }

    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::missing_key(ProviderKind::Anthropic));
        }
        self.messages(
            Some(system_prompt.to_string()),
            user_prompt.to_string(),
            1000,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn call_uses_api_key_header_and_parses_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "Claude says hi" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::with_base_url("sk-ant-test".to_string(), server.uri());
        assert_eq!(client.call("sys", "user").await.unwrap(), "Claude says hi");
    }

    #[tokio::test]
    async fn empty_key_fails_without_network() {
        let client = AnthropicClient::new(String::new());
        let err = client.probe().await.unwrap_err();
        assert_eq!(err.to_string(), "Anthropic Claude API key required");
    }
}
