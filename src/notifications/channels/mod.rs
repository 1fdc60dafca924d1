//! Delivery channels for notifications

pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorCategory, RotaErrorTrait};
use crate::notifications::Notification;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Channel temporarily unavailable
    #[error("Channel temporarily unavailable: {0}")]
    Unavailable(String),

    /// Endpoint refused the payload
    #[error("Rejected by endpoint: {0}")]
    Rejected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl RotaErrorTrait for ChannelError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::Unavailable(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

/// Response from sending a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the notification was successfully delivered
    pub success: bool,
    /// Channel that delivered (or failed to deliver) the notification
    pub channel: String,
    pub message: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "[{status}] {}", self.channel)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for notification channels
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Send a notification through this channel
    async fn send(&self, notification: &Notification) -> ChannelResult<DeliveryStatus>;
}

/// POST `payload` as JSON, retrying server errors with exponential backoff
///
/// Client errors (4xx) are not retried.
pub(crate) async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    payload: &serde_json::Value,
    max_retries: u32,
    base_delay: std::time::Duration,
) -> ChannelResult<()> {
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(base_delay * 2_u32.pow(attempt - 1)).await;
            tracing::debug!(attempt = attempt + 1, max = max_retries + 1, "Retrying delivery");
        }

        match client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response body".to_string());

                if status.is_client_error() {
                    return Err(ChannelError::Rejected(format!("HTTP {status}: {body}")));
                }
                last_error = Some(ChannelError::Unavailable(format!("HTTP {status}: {body}")));
            }
            Err(e) => last_error = Some(ChannelError::HttpError(e)),
        }
    }

    Err(last_error.unwrap_or_else(|| ChannelError::Unavailable("no attempt made".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_status_display() {
        let success = DeliveryStatus::success("webhook");
        assert!(success.to_string().contains("SUCCESS"));
        assert!(success.message.is_none());

        let failure = DeliveryStatus::failure("telegram", "HTTP 500");
        assert!(!failure.success);
        assert_eq!(failure.to_string(), "[FAILED] telegram: HTTP 500");
    }

    #[test]
    fn test_recoverability() {
        assert!(ChannelError::Unavailable("503".to_string()).is_recoverable());
        assert!(!ChannelError::Rejected("400".to_string()).is_recoverable());
        assert_eq!(
            ChannelError::InvalidConfig("empty".to_string()).category(),
            ErrorCategory::Config
        );
    }
}
