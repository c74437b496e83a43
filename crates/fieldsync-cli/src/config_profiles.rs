//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use fieldsync_core::util::{normalize_text_option, trim_base_url};
use fieldsync_core::SyncSettings;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub drain_interval_ms: Option<u64>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl fmt::Debug for CliProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CliProfile")
            .field("api_base_url", &self.api_base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoints", &self.endpoints)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("drain_interval_ms", &self.drain_interval_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldsync")
        .join(CONFIG_FILE_NAME)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) =
            normalize_profile_name(std::env::var("FIELDSYNC_PROFILE").ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Core settings for this profile; unset timers keep their defaults.
    pub fn to_settings(&self) -> SyncSettings {
        let defaults = SyncSettings::default();
        SyncSettings {
            api_base_url: self.api_base_url.clone(),
            endpoints: self.endpoints.clone(),
            auth_token: self.auth_token.clone(),
            request_timeout_ms: self
                .request_timeout_ms
                .unwrap_or(defaults.request_timeout_ms),
            drain_interval_ms: self
                .drain_interval_ms
                .unwrap_or(defaults.drain_interval_ms),
            poll_interval_ms: self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            ..defaults
        }
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| trim_base_url(&url).to_string());
        self.auth_token = normalize_text_option(self.auth_token.take());
        self.endpoints = std::mem::take(&mut self.endpoints)
            .into_iter()
            .filter_map(|(kind, path)| {
                let kind = normalize_text_option(Some(kind))?;
                let path = normalize_text_option(Some(path))?;
                Some((kind, path))
            })
            .collect();
    }
}
