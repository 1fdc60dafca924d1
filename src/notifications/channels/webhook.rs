//! Webhook notification channel
//!
//! Posts each notification as a JSON document.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{post_json_with_retry, Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::notifications::Notification;

/// Webhook channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retry attempts on failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per retry
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_backoff() -> u64 {
    1000
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            backoff_ms: default_backoff(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.url).map_err(|e| format!("Invalid webhook URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err("Webhook URL must use http or https".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Webhook notification channel
///
/// # Payload Format
///
/// ```json
/// {
///   "id": "notification-uuid",
///   "kind": "coverage_needed",
///   "date": "2026-02-08",
///   "title": "Sunday Service",
///   "role": "camera1",
///   "assignment_id": 12,
///   "person": "Ana",
///   "actor": "Ana",
///   "token": "5f0c...",
///   "pickup_url": "https://roster.example.org/pickup/5f0c...",
///   "created_at": "2026-02-01T12:00:00Z",
///   "text": "Coverage needed: ..."
/// }
/// ```
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn build_payload(&self, notification: &Notification) -> ChannelResult<serde_json::Value> {
        let mut payload = serde_json::to_value(notification)?;
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "text".to_string(),
                serde_json::Value::String(notification.format_message()),
            );
        }
        Ok(payload)
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, notification: &Notification) -> ChannelResult<DeliveryStatus> {
        let payload = self.build_payload(notification)?;

        post_json_with_retry(
            &self.client,
            &self.config.url,
            &payload,
            self.config.max_retries,
            Duration::from_millis(self.config.backoff_ms),
        )
        .await?;

        Ok(DeliveryStatus::success(self.name()))
    }
}
