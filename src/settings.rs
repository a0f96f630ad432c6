// src/settings.rs - On-disk settings with an authoritative in-memory cache
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::providers::ProviderKind;

pub const DEFAULT_SETTINGS_PATH: &str = "data/settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub auto_save: bool,
    pub dark_mode: bool,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_save: true,
            dark_mode: true,
            notifications: true,
        }
    }
}

/// The whole persisted configuration blob. Serialized as one JSON object;
/// every save rewrites it atomically from the in-memory copy.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_vendor: ProviderKind,
    pub api_keys: HashMap<ProviderKind, String>,
    pub preferences: Preferences,
}

impl Default for Settings {
    fn default() -> Self {
        let mut api_keys = HashMap::new();
        api_keys.insert(ProviderKind::Trickle, "built-in".to_string());
        api_keys.insert(ProviderKind::Google, String::new());
        api_keys.insert(ProviderKind::OpenAi, String::new());
        api_keys.insert(ProviderKind::Anthropic, String::new());
        api_keys.insert(ProviderKind::Custom, String::new());
        Self {
            default_vendor: ProviderKind::Google,
            api_keys,
            preferences: Preferences::default(),
        }
    }
}

// Credentials must never reach the logs, so Debug hides the key values.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("default_vendor", &self.default_vendor)
            .field("api_keys", &"<redacted>")
            .field("preferences", &self.preferences)
            .finish()
    }
}

impl Settings {
    pub fn api_key(&self, kind: ProviderKind) -> String {
        self.api_keys.get(&kind).cloned().unwrap_or_default()
    }
}

/// Partial update: shallow merge at the top level, matching how the UI
/// submits settings (whole sections at a time).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub default_vendor: Option<ProviderKind>,
    pub api_keys: Option<HashMap<ProviderKind, String>>,
    pub preferences: Option<Preferences>,
}

/// File-backed settings store. The in-memory cache is authoritative for the
/// lifetime of the process; the file is a best-effort mirror. A missing or
/// corrupt file is the same as no file.
pub struct SettingsStore {
    path: PathBuf,
    cache: RwLock<Settings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_settings(&path);
        Self {
            path,
            cache: RwLock::new(settings),
        }
    }

    pub fn load(&self) -> Settings {
        self.cache.read().unwrap().clone()
    }

    pub fn save(&self, patch: SettingsPatch) -> Settings {
        let merged = {
            let mut guard = self.cache.write().unwrap();
            if let Some(vendor) = patch.default_vendor {
                guard.default_vendor = vendor;
            }
            if let Some(api_keys) = patch.api_keys {
                guard.api_keys = api_keys;
            }
            if let Some(preferences) = patch.preferences {
                guard.preferences = preferences;
            }
            guard.clone()
        };
        if let Err(e) = self.persist(&merged) {
            tracing::warn!(
                "failed to persist settings to {}: {}",
                self.path.display(),
                e
            );
        }
        merged
    }

    fn persist(&self, settings: &Settings) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)
    }
}

fn read_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "settings file {} is unreadable ({}), using defaults",
                    path.display(),
                    e
                );
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json"));
        let settings = store.load();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_vendor, ProviderKind::Google);
        assert_eq!(settings.api_key(ProviderKind::Trickle), "built-in");
        assert!(settings.preferences.auto_save);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not valid json!!").unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn save_then_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path);
        let mut api_keys = store.load().api_keys;
        api_keys.insert(ProviderKind::Google, "test-key-123".to_string());
        store.save(SettingsPatch {
            default_vendor: Some(ProviderKind::Anthropic),
            api_keys: Some(api_keys),
            preferences: None,
        });

        // Same process: the cache reflects the merge.
        assert_eq!(store.load().default_vendor, ProviderKind::Anthropic);
        assert_eq!(store.load().api_key(ProviderKind::Google), "test-key-123");

        // Fresh process: the file mirror round-trips every field.
        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.load(), store.load());
    }

    #[test]
    fn patch_merges_shallowly_at_top_level() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json"));

        let before = store.load();
        let after = store.save(SettingsPatch {
            default_vendor: Some(ProviderKind::OpenAi),
            api_keys: None,
            preferences: None,
        });

        assert_eq!(after.default_vendor, ProviderKind::OpenAi);
        assert_eq!(after.api_keys, before.api_keys);
        assert_eq!(after.preferences, before.preferences);
    }

    #[test]
    fn debug_output_redacts_api_keys() {
        let mut settings = Settings::default();
        settings
            .api_keys
            .insert(ProviderKind::Google, "super-secret".to_string());
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
