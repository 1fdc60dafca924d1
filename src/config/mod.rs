//! Configuration management for rota
//!
//! This module handles loading and validating configuration from a TOML file
//! and environment variables. The roster itself (who exists, what they can do,
//! the rotation order) is part of the configuration and is threaded into the
//! generator and the lifecycle service as an immutable value.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::{EventFamily, Role, RESERVED_NAMES};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Who can be scheduled and for what
    pub roster: RosterConfig,

    /// Caps, gaps and scoring weights used by generation
    pub policy: PolicyConfig,

    /// Record store location
    pub storage: StorageConfig,

    /// Outbound notification settings
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// One roster member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonConfig {
    pub name: String,

    /// Roles this person may fill, across both weekly event types
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Personal monthly cap on primary-type events, overriding the policy default
    #[serde(default)]
    pub primary_cap: Option<u32>,

    /// Personal monthly cap on secondary-type leader slots
    #[serde(default)]
    pub leader_cap: Option<u32>,
}

impl PersonConfig {
    pub fn new(name: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            name: name.into(),
            roles: roles.to_vec(),
            primary_cap: None,
            leader_cap: None,
        }
    }

    pub fn can_fill(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn primary_roles(&self) -> impl Iterator<Item = &Role> {
        self.roles
            .iter()
            .filter(|r| r.family() == EventFamily::Primary)
    }
}

/// A fixed blackout window from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutConfig {
    pub person: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Static roster configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Weekday of the primary weekly event type
    pub primary_weekday: Weekday,

    /// Weekday of the secondary weekly event type
    pub secondary_weekday: Weekday,

    pub people: Vec<PersonConfig>,

    /// Members eligible for the higher monthly cap
    pub priority_pool: Vec<String>,

    /// Round-robin order for the rotation role
    pub rotation_order: Vec<String>,

    /// The primary-type role filled by rotation instead of scoring
    pub rotation_role: Role,

    pub blackouts: Vec<BlackoutConfig>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            primary_weekday: Weekday::Sun,
            secondary_weekday: Weekday::Fri,
            people: Vec::new(),
            priority_pool: Vec::new(),
            rotation_order: Vec::new(),
            rotation_role: Role::Computer,
            blackouts: Vec::new(),
        }
    }
}

impl RosterConfig {
    pub fn person(&self, name: &str) -> Option<&PersonConfig> {
        self.people.iter().find(|p| p.name == name)
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.person(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.people.iter().map(|p| p.name.as_str())
    }

    pub fn can_fill(&self, name: &str, role: Role) -> bool {
        self.person(name).is_some_and(|p| p.can_fill(role))
    }

    /// Members able to fill `role`, in configuration order
    pub fn candidates_for(&self, role: Role) -> Vec<&str> {
        self.people
            .iter()
            .filter(|p| p.can_fill(role))
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn in_priority_pool(&self, name: &str) -> bool {
        self.priority_pool.iter().any(|p| p == name)
    }

    /// Family of a weekday, if it is one of the two weekly event days
    pub fn family_of_weekday(&self, weekday: Weekday) -> Option<EventFamily> {
        if weekday == self.primary_weekday {
            Some(EventFamily::Primary)
        } else if weekday == self.secondary_weekday {
            Some(EventFamily::Secondary)
        } else {
            None
        }
    }
}

/// Scoring weights; lower total score wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Worked fewer than `recent_window_days` ago
    pub fatigue_recent: i64,
    /// Worked exactly a week ago
    pub fatigue_weekly: i64,
    /// Worked fewer than `near_window_days` ago
    pub fatigue_near: i64,
    pub recent_window_days: i64,
    pub near_window_days: i64,
    /// Per all-time assignment
    pub fairness_per_assignment: i64,
    pub total_cap_pressure: i64,
    pub primary_cap_pressure: i64,
    pub leader_cap_pressure: i64,
    /// Per primary-type slot already held this month, on leader slots
    pub cross_type_bias: i64,
    pub consecutive_primary: i64,
    pub specialist_bonus: i64,
    pub priority_bonus: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            fatigue_recent: 2000,
            fatigue_weekly: 1500,
            fatigue_near: 200,
            recent_window_days: 3,
            near_window_days: 10,
            fairness_per_assignment: 2000,
            total_cap_pressure: 60_000,
            primary_cap_pressure: 80_000,
            leader_cap_pressure: 50_000,
            cross_type_bias: 1200,
            consecutive_primary: 200_000,
            specialist_bonus: 300,
            priority_bonus: 400,
        }
    }
}

/// Generation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Base monthly cap on total assignments
    pub monthly_total_cap: u32,
    /// Extra monthly allowance for priority-pool members
    pub priority_extra: u32,
    /// Extra monthly allowance for people trailing the all-time average
    pub catch_up_extra: u32,
    /// How far below the average a person must be to get the catch-up allowance
    pub catch_up_margin: f64,
    pub primary_monthly_cap: u32,
    pub leader_monthly_cap: u32,
    /// Minimum days between two primary-type assignments of one person
    pub min_primary_gap_days: i64,
    /// Rotation candidates with a fatigue penalty at or above this are passed over
    pub rotation_fatigue_threshold: i64,
    pub weights: ScoringWeights,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            monthly_total_cap: 3,
            priority_extra: 1,
            catch_up_extra: 1,
            catch_up_margin: 1.5,
            primary_monthly_cap: 2,
            leader_monthly_cap: 2,
            min_primary_gap_days: 8,
            rotation_fatigue_threshold: 1500,
            weights: ScoringWeights::default(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/roster.db"),
        }
    }
}

/// Telegram bot credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Notification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Public base URL used to build pickup links
    pub base_url: String,

    /// JSON webhook endpoint (optional)
    pub webhook_url: Option<String>,

    /// Telegram bot (optional)
    pub telegram: Option<TelegramConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:5000"),
            webhook_url: None,
            telegram: None,
        }
    }
}

impl NotificationConfig {
    pub fn pickup_url(&self, token: &str) -> String {
        format!("{}/pickup/{}", self.base_url.trim_end_matches('/'), token)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    /// Load from `path` (or `ROTA_CONFIG`, or `config.toml` if present), then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("ROTA_CONFIG").ok().map(PathBuf::from);
        let candidate = path
            .map(Path::to_path_buf)
            .or(env_path)
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        let config = if candidate.exists() {
            Self::from_file(&candidate)?
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", candidate.display());
        } else {
            tracing::warn!(path = %candidate.display(), "No config file found, using defaults");
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Apply `ROTA_*` and `TELEGRAM_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("ROTA_SQLITE_PATH") {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("ROTA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ROTA_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(base_url) = std::env::var("ROTA_BASE_URL") {
            self.notifications.base_url = base_url;
        }
        if let Ok(webhook) = std::env::var("ROTA_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(webhook);
        }

        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();
        if let (Some(bot_token), Some(chat_id)) = (bot_token, chat_id) {
            self.notifications.telegram = Some(TelegramConfig { bot_token, chat_id });
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.roster.validate()?;
        self.policy.validate()?;

        url::Url::parse(&self.notifications.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.notifications.base_url))?;

        if let Some(webhook) = &self.notifications.webhook_url {
            url::Url::parse(webhook).with_context(|| format!("Invalid webhook_url: {webhook}"))?;
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }
}

impl RosterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.primary_weekday == self.secondary_weekday {
            anyhow::bail!("primary_weekday and secondary_weekday must differ");
        }

        let mut seen = HashSet::new();
        for person in &self.people {
            if person.name.trim().is_empty() {
                anyhow::bail!("roster member names must not be empty");
            }
            if RESERVED_NAMES.contains(&person.name.as_str()) {
                anyhow::bail!("'{}' is a reserved name", person.name);
            }
            if !seen.insert(person.name.as_str()) {
                anyhow::bail!("duplicate roster member '{}'", person.name);
            }
        }

        for name in &self.priority_pool {
            if !self.is_member(name) {
                anyhow::bail!("priority_pool member '{name}' is not on the roster");
            }
        }

        for name in &self.rotation_order {
            if !self.can_fill(name, self.rotation_role) {
                anyhow::bail!(
                    "rotation_order member '{name}' is not on the roster or cannot fill {}",
                    self.rotation_role
                );
            }
        }

        if self.rotation_role.family() != EventFamily::Primary {
            anyhow::bail!("rotation_role must be a primary-type role");
        }

        for blackout in &self.blackouts {
            if !self.is_member(&blackout.person) {
                anyhow::bail!("blackout for unknown member '{}'", blackout.person);
            }
            if blackout.start > blackout.end {
                anyhow::bail!("blackout for '{}' ends before it starts", blackout.person);
            }
        }

        Ok(())
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.monthly_total_cap == 0 {
            anyhow::bail!("monthly_total_cap must be greater than 0");
        }
        if self.primary_monthly_cap == 0 || self.leader_monthly_cap == 0 {
            anyhow::bail!("per-type monthly caps must be greater than 0");
        }
        if self.min_primary_gap_days < 0 {
            anyhow::bail!("min_primary_gap_days must not be negative");
        }
        if !self.catch_up_margin.is_finite() || self.catch_up_margin < 0.0 {
            anyhow::bail!("catch_up_margin must be a non-negative number");
        }
        Ok(())
    }
}
