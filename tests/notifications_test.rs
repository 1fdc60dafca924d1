//! Integration tests for notification delivery using wiremock

mod common;

use common::{config_with, date, seed_slot, service_with};
use rota::config::{NotificationConfig, TelegramConfig};
use rota::lifecycle::{Action, Actor};
use rota::models::Role;
use rota::notifications::channels::webhook::WebhookConfig;
use rota::notifications::channels::ChannelError;
use rota::notifications::{Channel, Notification, NotificationManager, TelegramChannel, WebhookChannel};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Decline a future slot and return the resulting coverage notification
fn coverage_notification() -> Notification {
    let service = service_with(config_with(&["Ana", "Ben"]));
    let slot = seed_slot(&service, date(2026, 2, 8), Role::Camera1, "Ana");
    service
        .apply_action(slot, &Actor::person("Ana"), Action::Decline)
        .unwrap()
        .notifications
        .remove(0)
}

#[tokio::test]
async fn test_webhook_posts_json_payload() {
    let mock_server = MockServer::start().await;
    let notification = coverage_notification();

    Mock::given(method("POST"))
        .and(path("/hooks/roster"))
        .and(body_partial_json(serde_json::json!({
            "kind": "coverage_needed",
            "date": "2026-02-08",
            "role": "camera1",
            "person": "Ana",
            "token": notification.token,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let channel = WebhookChannel::from_url(format!("{}/hooks/roster", mock_server.uri())).unwrap();
    let status = channel.send(&notification).await.unwrap();
    assert!(status.success);
    assert_eq!(status.channel, "webhook");
}

#[tokio::test]
async fn test_webhook_retries_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = WebhookConfig::new(format!("{}/hook", mock_server.uri()))
        .with_max_retries(2)
        .with_backoff_ms(10);
    let channel = WebhookChannel::new(config).unwrap();

    let status = channel.send(&coverage_notification()).await.unwrap();
    assert!(status.success);
}

#[tokio::test]
async fn test_webhook_does_not_retry_client_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = WebhookConfig::new(format!("{}/hook", mock_server.uri()))
        .with_max_retries(3)
        .with_backoff_ms(10);
    let channel = WebhookChannel::new(config).unwrap();

    let err = channel.send(&coverage_notification()).await.unwrap_err();
    assert!(matches!(err, ChannelError::Rejected(msg) if msg.contains("bad payload")));
}

#[tokio::test]
async fn test_telegram_sends_html_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-100",
            "parse_mode": "HTML",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let channel = TelegramChannel::new(TelegramConfig {
        bot_token: "123:abc".to_string(),
        chat_id: "-100".to_string(),
    })
    .unwrap()
    .with_api_base(mock_server.uri());

    let status = channel.send(&coverage_notification()).await.unwrap();
    assert!(status.success);
    assert_eq!(status.channel, "telegram");
}

#[tokio::test]
async fn test_manager_reports_failures_without_erroring() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut manager = NotificationManager::new();
    manager.add_channel(Box::new(
        WebhookChannel::from_url(format!("{}/ok", mock_server.uri())).unwrap(),
    ));
    manager.add_channel(Box::new(
        WebhookChannel::from_url(format!("{}/broken", mock_server.uri())).unwrap(),
    ));

    let statuses = manager.deliver(&coverage_notification()).await;
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses.iter().filter(|s| s.success).count(), 1);

    let failed = statuses.iter().find(|s| !s.success).unwrap();
    assert!(failed.message.as_deref().unwrap_or_default().contains("404"));
}

#[tokio::test]
async fn test_notify_survives_broken_channel_setup() {
    let notification = coverage_notification();

    let config = NotificationConfig {
        webhook_url: Some("ftp://hooks.example.org/roster".to_string()),
        ..NotificationConfig::default()
    };
    let statuses = NotificationManager::notify(&config, std::slice::from_ref(&notification)).await;
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].success);
    assert_eq!(statuses[0].channel, "setup");

    let quiet = NotificationManager::notify(&NotificationConfig::default(), &[notification]).await;
    assert!(quiet.is_empty());
}
