//! Telegram bot channel
//!
//! Sends an HTML-formatted message through the Bot API `sendMessage` method.
//! Every user-supplied string is escaped before it is placed in the markup.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{post_json_with_retry, Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::config::TelegramConfig;
use crate::notifications::{Notification, NotificationKind};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramChannel {
    config: TelegramConfig,
    api_base: String,
    client: Client,
    max_retries: u32,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> ChannelResult<Self> {
        if config.bot_token.trim().is_empty() || config.chat_id.trim().is_empty() {
            return Err(ChannelError::InvalidConfig(
                "Telegram bot token and chat id are required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            config,
            api_base: DEFAULT_API_BASE.to_string(),
            client,
            max_retries: 2,
        })
    }

    /// Point the channel at another Bot API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token)
    }

    /// HTML body for `notification`
    pub fn render(notification: &Notification) -> String {
        let esc = |s: &str| html_escape::encode_text(s).to_string();
        let title = esc(&notification.title);
        let role = esc(notification.role.as_str());
        let date = notification.date.format("%B %d");

        match notification.kind {
            NotificationKind::CoverageNeeded => {
                let mut message = format!(
                    "🔴 <b>Coverage Needed!</b>\n\n{} can't make it to:\n📆 <b>{title}</b> on {date}\n👤 <b>{role}</b>\n",
                    esc(&notification.person)
                );
                match &notification.pickup_url {
                    Some(url) => message.push_str(&format!(
                        "\n👉 <a href=\"{}\">Click here to pick up this shift</a>",
                        html_escape::encode_double_quoted_attribute(url)
                    )),
                    None => message.push_str("\nCan someone cover this shift?"),
                }
                message
            }
            NotificationKind::ShiftCovered => {
                let actor = esc(&notification.actor);
                format!(
                    "✅ <b>Shift Covered!</b>\n\n{actor} will cover:\n📆 <b>{title}</b> on {date}\n👤 <b>{role}</b>\n\nThank you {actor}!"
                )
            }
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, notification: &Notification) -> ChannelResult<DeliveryStatus> {
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": Self::render(notification),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        post_json_with_retry(
            &self.client,
            &self.endpoint(),
            &payload,
            self.max_retries,
            Duration::from_millis(500),
        )
        .await?;

        Ok(DeliveryStatus::success(self.name()))
    }
}
