// src/pipeline.rs - The generation pipeline: primary call, bounded retry
// with exponential backoff, built-in fallback raced against a timeout, and
// a deterministic local template as the terminal tier. The pipeline never
// surfaces an error; failures only degrade the source tier.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{ConnectionTracker, ProviderClient, ProviderError, ProviderKind};
use crate::trickle_client::TrickleClient;

/// How long the built-in fallback may run before it counts as failed.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry schedule for the primary tier. The defaults are the contract:
/// up to 3 retries after the first failure, delays of base * 2^attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt)
    }
}

/// Which tier produced the returned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    Primary,
    FallbackProvider,
    LocalTemplate,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub source: SourceTier,
}

/// Form preferences carried alongside every generation request. They feed
/// the prompt builders and, when every remote tier fails, the local
/// template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    pub topic: Option<String>,
    pub style: String,
    pub duration: String,
    pub mood: String,
    pub quality: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            topic: None,
            style: "cinematic".to_string(),
            duration: "30s".to_string(),
            mood: "energetic".to_string(),
            quality: "4K".to_string(),
        }
    }
}

pub struct GenerationPipeline {
    primary: Arc<dyn ProviderClient>,
    fallback: Arc<TrickleClient>,
    tracker: Arc<ConnectionTracker>,
    retry: RetryPolicy,
    fallback_timeout: Duration,
}

impl GenerationPipeline {
    pub fn new(
        primary: Arc<dyn ProviderClient>,
        fallback: Arc<TrickleClient>,
        tracker: Arc<ConnectionTracker>,
    ) -> Self {
        Self {
            primary,
            fallback,
            tracker,
            retry: RetryPolicy::default(),
            fallback_timeout: FALLBACK_TIMEOUT,
        }
    }

    /// Shrinks the timing constants. Production code sticks with the
    /// defaults; tests pass millisecond-scale values.
    pub fn with_timing(mut self, retry: RetryPolicy, fallback_timeout: Duration) -> Self {
        self.retry = retry;
        self.fallback_timeout = fallback_timeout;
        self
    }

    /// Always resolves to text. Remote failures are consumed here and only
    /// the source tier tells the caller what happened.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationOutcome {
        let primary_kind = self.primary.kind();

        match self.attempt_primary(system_prompt, user_prompt).await {
            Ok(text) => {
                self.tracker.mark(primary_kind, true);
                return GenerationOutcome {
                    text,
                    source: SourceTier::Primary,
                };
            }
            Err(e) => {
                tracing::warn!("{} provider failed: {}", primary_kind, e);
            }
        }

        match self.attempt_fallback(system_prompt, user_prompt).await {
            Ok(text) => {
                self.tracker.mark(ProviderKind::Trickle, true);
                return GenerationOutcome {
                    text,
                    source: SourceTier::FallbackProvider,
                };
            }
            Err(e) => {
                tracing::warn!("built-in fallback failed: {}", e);
            }
        }

        // Every remote path is exhausted; the primary vendor is what the
        // user needs to fix.
        self.tracker.mark(primary_kind, false);
        GenerationOutcome {
            text: fallback_response(user_prompt, options),
            source: SourceTier::LocalTemplate,
        }
    }

    async fn attempt_primary(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.primary.call(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::info!(
                        "{} unavailable ({}), retrying in {:?} (attempt {}/{})",
                        self.primary.kind(),
                        e,
                        delay,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_fallback(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let text = tokio::time::timeout(
            self.fallback_timeout,
            self.fallback.invoke(system_prompt, user_prompt),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.fallback_timeout))??;

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "empty response from fallback agent".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Terminal tier: pure string formatting over the caller's options. Same
/// options in, same text out, no I/O.
pub fn fallback_response(user_prompt: &str, options: &GenerationOptions) -> String {
    if options.topic.is_some() || user_prompt.contains("video") {
        let subject = options.topic.as_deref().unwrap_or("the specified subject");
        format!(
            "Professional {style} video featuring {subject}. \
Duration: {duration} with {quality} quality resolution. \
{mood} mood with professional camera work, dynamic lighting, and engaging composition. \
Modern video production techniques with attention to detail and visual storytelling. \
Smooth camera movements and professional grade cinematography.",
            style = options.style,
            subject = subject,
            duration = options.duration,
            quality = options.quality,
            mood = capitalize(&options.mood),
        )
    } else {
        "High-quality video production with professional cinematography, \
dynamic camera work, and engaging visual storytelling. Modern techniques \
with attention to detail and creative composition."
            .to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
