// src/trickle_client.rs - Built-in Trickle AI agent client.
// The agent is the zero-configuration fallback vendor: no API key, one
// invoke endpoint, a plain text answer.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::providers::{ProviderClient, ProviderError, ProviderKind};

/// The agent normally runs as a local sidecar; override with TRICKLE_AGENT_URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8790";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TrickleClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    #[serde(rename = "systemPrompt")]
    system_prompt: &'a str,
    #[serde(rename = "userPrompt")]
    user_prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    text: String,
}

impl TrickleClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// One round trip to the agent. The pipeline races this against its own
    /// timeout, so no retry logic lives here.
    pub async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = InvokeRequest {
            system_prompt,
            user_prompt,
        };

        let response = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .header("Content-Type", "application/json")
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
            tracing::warn!("Trickle agent returned {}", status);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let parsed: InvokeResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl ProviderClient for TrickleClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Trickle
    }

    async fn probe(&self) -> Result<String, ProviderError> {
        let response = self
            .invoke(
                "You are a test AI. Respond with \"Connection successful\"",
                "Test connection",
            )
            .await?;
        if response.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "empty response from agent".to_string(),
            ));
        }
        Ok("Trickle AI connected successfully".to_string())
    }

    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.invoke(system_prompt, user_prompt).await
    }
}
