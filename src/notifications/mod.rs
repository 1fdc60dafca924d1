//! Notifier gateway
//!
//! The lifecycle core produces [`Notification`] values and never waits on
//! their delivery. The [`NotificationManager`] fans each one out to every
//! configured channel; delivery is best-effort and a failure is only logged
//! and counted.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      RosterService (after commit)          │
//! │  - CoverageNeeded (with pickup link)       │
//! │  - ShiftCovered                            │
//! └────────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌────────────────────────────────────────────┐
//! │      NotificationManager                   │
//! └────────────────────────────────────────────┘
//!               │             │
//!               ▼             ▼
//!         ┌─────────┐   ┌──────────┐
//!         │ Webhook │   │ Telegram │
//!         │ Channel │   │ Channel  │
//!         └─────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rota::notifications::NotificationManager;
//!
//! let manager = NotificationManager::from_config(&config.notifications)?;
//! let outcome = service.apply_action(reference, &actor, Action::Decline)?;
//! manager.deliver_all(&outcome.notifications).await;
//! ```

pub mod channels;
mod manager;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Assignment, Event, Role};

pub use channels::telegram::TelegramChannel;
pub use channels::webhook::WebhookChannel;
pub use channels::Channel;
pub use manager::NotificationManager;

/// What happened to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone declined; the slot needs a cover
    CoverageNeeded,
    /// Someone picked up a slot that needed coverage
    ShiftCovered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoverageNeeded => "coverage_needed",
            Self::ShiftCovered => "shift_covered",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outbound alert about a role slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub date: NaiveDate,
    /// Event title as displayed
    pub title: String,
    pub role: Role,
    pub assignment_id: i64,
    /// Holder of the slot
    pub person: String,
    /// Who declined, or who picked the shift up
    pub actor: String,
    /// Hand-off token for a coverage request
    pub token: Option<String>,
    pub pickup_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(kind: NotificationKind, event: &Event, assignment: &Assignment, actor: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            date: event.date,
            title: event.display_title().to_string(),
            role: assignment.role,
            assignment_id: assignment.id,
            person: assignment.person.to_string(),
            actor: actor.to_string(),
            token: None,
            pickup_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn coverage_needed(event: &Event, assignment: &Assignment, actor: &str) -> Self {
        Self::new(NotificationKind::CoverageNeeded, event, assignment, actor)
    }

    pub fn shift_covered(event: &Event, assignment: &Assignment, actor: &str) -> Self {
        Self::new(NotificationKind::ShiftCovered, event, assignment, actor)
    }

    /// Attach the hand-off token and its pickup link
    pub fn with_token(mut self, token: impl Into<String>, pickup_url: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.pickup_url = Some(pickup_url.into());
        self
    }

    /// Plain-text rendering
    pub fn format_message(&self) -> String {
        let date = self.date.format("%B %d");
        match self.kind {
            NotificationKind::CoverageNeeded => {
                let mut message = format!(
                    "Coverage needed: {} can't make it to {} on {} ({})",
                    self.person, self.title, date, self.role
                );
                if let Some(url) = &self.pickup_url {
                    message.push_str(&format!("\nPick up this shift: {url}"));
                }
                message
            }
            NotificationKind::ShiftCovered => format!(
                "Shift covered: {} will cover {} on {} ({})",
                self.actor, self.title, date, self.role
            ),
        }
    }
}
