// src/providers.rs - Provider catalog, error taxonomy, and the client seam
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// The fixed set of AI vendors the app can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Trickle,
    Google,
    OpenAi,
    Anthropic,
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Trickle => "trickle",
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        vendor_info(*self).name
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static display metadata for one vendor. Defined once at startup, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct VendorInfo {
    pub id: ProviderKind,
    pub name: &'static str,
    pub external: bool,
    pub requires_key: bool,
    pub recommended: bool,
}

lazy_static! {
    static ref VENDOR_CATALOG: HashMap<ProviderKind, VendorInfo> = {
        let mut catalog = HashMap::new();
        catalog.insert(
            ProviderKind::Trickle,
            VendorInfo {
                id: ProviderKind::Trickle,
                name: "Trickle AI (Built-in)",
                external: false,
                requires_key: false,
                recommended: true,
            },
        );
        catalog.insert(
            ProviderKind::Google,
            VendorInfo {
                id: ProviderKind::Google,
                name: "Google Gemini",
                external: true,
                requires_key: true,
                recommended: false,
            },
        );
        catalog.insert(
            ProviderKind::OpenAi,
            VendorInfo {
                id: ProviderKind::OpenAi,
                name: "OpenAI GPT",
                external: true,
                requires_key: true,
                recommended: false,
            },
        );
        catalog.insert(
            ProviderKind::Anthropic,
            VendorInfo {
                id: ProviderKind::Anthropic,
                name: "Anthropic Claude",
                external: true,
                requires_key: true,
                recommended: false,
            },
        );
        catalog.insert(
            ProviderKind::Custom,
            VendorInfo {
                id: ProviderKind::Custom,
                name: "Custom API",
                external: true,
                requires_key: true,
                recommended: false,
            },
        );
        catalog
    };
}

pub fn vendor_info(kind: ProviderKind) -> &'static VendorInfo {
    &VENDOR_CATALOG[&kind]
}

pub fn all_vendors() -> Vec<&'static VendorInfo> {
    let mut vendors: Vec<_> = VENDOR_CATALOG.values().collect();
    vendors.sort_by_key(|v| v.id.as_str());
    vendors
}

/// Outcome of a connection probe, surfaced as-is to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

/// Everything that can go wrong talking to a provider. Only overload (503)
/// and transport failures are worth retrying; the rest fall through to the
/// next tier immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    MissingCredential(String),
    #[error("provider overloaded (HTTP 503): {0}")]
    Overloaded(String),
    #[error("API error {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid response format: {0}")]
    MalformedResponse(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn missing_key(kind: ProviderKind) -> Self {
        ProviderError::MissingCredential(format!("{} API key required", kind.label()))
    }

    pub fn from_status(status: u16, body: String) -> Self {
        if status == 503 {
            ProviderError::Overloaded(body)
        } else {
            ProviderError::Rejected { status, body }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Overloaded(_) | ProviderError::Network(_)
        )
    }
}

/// One remote vendor: a cheap liveness probe plus the real generation call.
/// Probing never retries; retry policy belongs to the generation pipeline.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Single bounded round trip with a minimal payload. Returns a
    /// human-readable confirmation message on success.
    async fn probe(&self) -> Result<String, ProviderError>;

    /// Full generation call. The system and user instructions are combined
    /// into whatever payload shape the vendor expects.
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;
}

/// Last-known liveness per vendor. Updated by probes and by pipeline runs;
/// read synchronously by the status projector. Never persisted.
#[derive(Default)]
pub struct ConnectionTracker {
    states: RwLock<HashMap<ProviderKind, bool>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, kind: ProviderKind, connected: bool) {
        self.states.write().unwrap().insert(kind, connected);
    }

    pub fn is_connected(&self, kind: ProviderKind) -> bool {
        self.states
            .read()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_labels_and_flags() {
        assert_eq!(vendor_info(ProviderKind::Google).name, "Google Gemini");
        assert_eq!(
            vendor_info(ProviderKind::Trickle).name,
            "Trickle AI (Built-in)"
        );
        assert!(!vendor_info(ProviderKind::Trickle).requires_key);
        assert!(vendor_info(ProviderKind::Trickle).recommended);
        assert!(vendor_info(ProviderKind::Custom).requires_key);
        assert!(vendor_info(ProviderKind::OpenAi).external);
        assert_eq!(all_vendors().len(), 5);
    }

    #[test]
    fn kind_round_trips_through_serde() {
        let json = serde_json::to_string(&ProviderKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: ProviderKind = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, ProviderKind::Anthropic);
    }

    #[test]
    fn only_overload_and_network_are_retryable() {
        assert!(ProviderError::Overloaded("overloaded".into()).is_retryable());
        assert!(ProviderError::Network("connection reset".into()).is_retryable());
        assert!(!ProviderError::missing_key(ProviderKind::Google).is_retryable());
        assert!(!ProviderError::Rejected {
            status: 404,
            body: "not found".into()
        }
        .is_retryable());
        assert!(!ProviderError::MalformedResponse("no candidates".into()).is_retryable());
        assert!(!ProviderError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn status_503_maps_to_overloaded() {
        assert!(matches!(
            ProviderError::from_status(503, "busy".into()),
            ProviderError::Overloaded(_)
        ));
        assert!(matches!(
            ProviderError::from_status(429, "slow down".into()),
            ProviderError::Rejected { status: 429, .. }
        ));
    }

    #[test]
    fn missing_key_message_names_the_vendor() {
        let err = ProviderError::missing_key(ProviderKind::Google);
        assert_eq!(err.to_string(), "Google Gemini API key required");
    }

    #[test]
    fn tracker_defaults_to_disconnected() {
        let tracker = ConnectionTracker::new();
        assert!(!tracker.is_connected(ProviderKind::Google));
        tracker.mark(ProviderKind::Google, true);
        assert!(tracker.is_connected(ProviderKind::Google));
        tracker.mark(ProviderKind::Google, false);
        assert!(!tracker.is_connected(ProviderKind::Google));
    }
}
