//! Sync configuration shared by every host.
//!
//! `SyncSettings` carries the remote API location, endpoint overrides and the
//! timers that drive polling, auto-drain and the offline notice.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option, trim_base_url};
use crate::{Error, Result};

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_OFFLINE_NOTICE_MS: u64 = 3_000;

/// Runtime settings for the offline write queue.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Base URL joined with relative endpoint paths
    pub api_base_url: Option<String>,
    /// `type -> path` overrides merged over the built-in routes
    pub endpoints: BTreeMap<String, String>,
    /// Bearer token forwarded on every queued write
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,
    pub drain_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub offline_notice_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            endpoints: BTreeMap::new(),
            auth_token: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            offline_notice_ms: DEFAULT_OFFLINE_NOTICE_MS,
        }
    }
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("api_base_url", &self.api_base_url)
            .field("endpoints", &self.endpoints)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("drain_interval_ms", &self.drain_interval_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("offline_notice_ms", &self.offline_notice_ms)
            .finish()
    }
}

impl SyncSettings {
    /// Parse settings from JSON and normalize them.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str::<Self>(raw)?.normalized()
    }

    /// Trim text fields, validate URLs and reject zero-length timers.
    pub fn normalized(mut self) -> Result<Self> {
        self.api_base_url = normalize_text_option(self.api_base_url)
            .map(|url| normalize_http_url(&url, "api_base_url"))
            .transpose()?;
        self.auth_token = normalize_text_option(self.auth_token);

        let mut endpoints = BTreeMap::new();
        for (kind, path) in self.endpoints {
            let kind = kind.trim().to_string();
            let Some(path) = normalize_text_option(Some(path)) else {
                return Err(Error::InvalidInput(format!(
                    "endpoint for '{kind}' must not be empty"
                )));
            };
            if kind.is_empty() {
                return Err(Error::InvalidInput(
                    "endpoint override needs an operation type".to_string(),
                ));
            }
            endpoints.insert(kind, path);
        }
        self.endpoints = endpoints;

        for (field, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("drain_interval_ms", self.drain_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("offline_notice_ms", self.offline_notice_ms),
        ] {
            if value == 0 {
                return Err(Error::InvalidInput(format!("{field} must be positive")));
            }
        }

        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub const fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn offline_notice(&self) -> Duration {
        Duration::from_millis(self.offline_notice_ms)
    }
}

fn normalize_http_url(value: &str, field: &str) -> Result<String> {
    if is_http_url(value) {
        Ok(trim_base_url(value).to_string())
    } else {
        Err(Error::InvalidInput(format!(
            "{field} must include http:// or https://"
        )))
    }
}
