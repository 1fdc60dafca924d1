//! Notification manager for best-effort fan-out

use futures::future::join_all;

use super::channels::telegram::TelegramChannel;
use super::channels::webhook::WebhookChannel;
use super::channels::{Channel, ChannelResult, DeliveryStatus};
use super::Notification;
use crate::config::NotificationConfig;
use crate::metrics;

/// Notification manager that routes notifications to every channel
#[derive(Default)]
pub struct NotificationManager {
    channels: Vec<Box<dyn Channel>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the channels named in the configuration
    pub fn from_config(config: &NotificationConfig) -> ChannelResult<Self> {
        let mut manager = Self::new();
        if let Some(url) = &config.webhook_url {
            manager.add_channel(Box::new(WebhookChannel::from_url(url)?));
        }
        if let Some(telegram) = &config.telegram {
            manager.add_channel(Box::new(TelegramChannel::new(telegram.clone())?));
        }
        tracing::debug!(channels = manager.channels.len(), "Notification channels configured");
        Ok(manager)
    }

    /// Build the configured channels and deliver `notifications`
    ///
    /// Never fails: channels that cannot be set up turn every notification
    /// into a failed delivery.
    pub async fn notify(
        config: &NotificationConfig,
        notifications: &[Notification],
    ) -> Vec<DeliveryStatus> {
        if notifications.is_empty() {
            return Vec::new();
        }
        match Self::from_config(config) {
            Ok(manager) => manager.deliver_all(notifications).await,
            Err(e) => {
                tracing::warn!(error = %e, "Notification channels unavailable");
                metrics::record_delivery("setup", false);
                notifications
                    .iter()
                    .map(|_| DeliveryStatus::failure("setup", e.to_string()))
                    .collect()
            }
        }
    }

    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send one notification through every channel concurrently
    ///
    /// Never fails: channel errors become failed delivery statuses.
    pub async fn deliver(&self, notification: &Notification) -> Vec<DeliveryStatus> {
        let sends = self.channels.iter().map(|channel| async move {
            let status = match channel.send(notification).await {
                Ok(status) => status,
                Err(e) => DeliveryStatus::failure(channel.name(), e.to_string()),
            };
            if status.success {
                tracing::info!(
                    channel = channel.name(),
                    kind = %notification.kind,
                    date = %notification.date,
                    "Notification delivered"
                );
            } else {
                tracing::warn!(
                    channel = channel.name(),
                    kind = %notification.kind,
                    error = status.message.as_deref().unwrap_or_default(),
                    "Notification delivery failed"
                );
            }
            metrics::record_delivery(channel.name(), status.success);
            status
        });
        join_all(sends).await
    }

    pub async fn deliver_all(&self, notifications: &[Notification]) -> Vec<DeliveryStatus> {
        let mut statuses = Vec::new();
        for notification in notifications {
            statuses.extend(self.deliver(notification).await);
        }
        statuses
    }
}
