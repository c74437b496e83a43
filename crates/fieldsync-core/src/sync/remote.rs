//! Outbound delivery of queued payloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;

use crate::config::SyncSettings;
use crate::util::{compact_text, duration_millis};
use crate::Result;

/// Why a single delivery failed. The display form is stored as `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("{0}")]
    Unroutable(String),
}

/// Remote write endpoint consumed by the sync engine.
#[async_trait]
pub trait RemoteWriter: Send + Sync {
    /// POST `body` as JSON to `url`. Any 2xx status is success.
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<(), DeliveryError>;
}

/// `RemoteWriter` over reqwest.
#[derive(Clone)]
pub struct HttpRemoteWriter {
    client: reqwest::Client,
    auth_token: Option<String>,
    timeout_ms: u64,
}

impl HttpRemoteWriter {
    pub fn new(timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            auth_token,
            timeout_ms: duration_millis(timeout),
        })
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        Self::new(settings.request_timeout(), settings.auth_token.clone())
    }
}

#[async_trait]
impl RemoteWriter for HttpRemoteWriter {
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                DeliveryError::Timeout(self.timeout_ms)
            } else {
                DeliveryError::Transport(compact_text(&error.to_string()))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                "POST {url} returned HTTP {}: {}",
                status.as_u16(),
                compact_text(&body)
            );
            Err(DeliveryError::Http {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_errors_render_short_diagnostics() {
        assert_eq!(DeliveryError::Http { status: 500 }.to_string(), "HTTP 500");
        assert_eq!(
            DeliveryError::Timeout(15_000).to_string(),
            "timed out after 15000 ms"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_is_a_transport_failure() {
        let writer = HttpRemoteWriter::new(Duration::from_secs(2), None).unwrap();
        let error = writer
            .post_json("http://127.0.0.1:9/rest/jobs", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::Transport(_) | DeliveryError::Timeout(_)
        ));
    }
}
