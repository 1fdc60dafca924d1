//! rota - Volunteer roster generation and shift hand-off
//!
//! Builds monthly rosters for a small team staffing two weekly event types,
//! then manages each assignment through confirmation, decline, coverage,
//! swaps and single-use hand-off links.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Roster, policy, storage and notification settings
//! - [`models`] - Events, assignments, roles and tokens
//! - [`availability`] - Blackouts and recurring unavailability
//! - [`history`] - Per-person workload statistics over stored events
//! - [`scheduler`] - Month generation: scoring, rotation and relaxation tiers
//! - [`lifecycle`] - Assignment state machine and the [`RosterService`] facade
//! - [`notifications`] - Webhook and Telegram delivery
//! - [`storage`] - SQLite and in-memory repositories
//! - [`metrics`] - Prometheus counters
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rota::config::Config;
//! use rota::lifecycle::RosterService;
//! use rota::scheduler::YearMonth;
//! use rota::storage::repository::create_sqlite_repository;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::load(None)?);
//!     let repo = create_sqlite_repository("rota.db")?;
//!     let service = RosterService::new(config, repo);
//!     let report = service.generate_month("2026-02".parse::<YearMonth>()?)?;
//!     println!("created {} events", report.created.len());
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, RotaErrorTrait};
    pub use crate::lifecycle::{Action, ActionOutcome, Actor, RosterService};
    pub use crate::models::{
        Assignment, AssignmentRef, AssignmentStatus, Event, EventKind, Occupant, Role,
    };
    pub use crate::notifications::{Notification, NotificationManager};
    pub use crate::scheduler::{GenerationReport, YearMonth};
    pub use crate::storage::{RosterRepository, SharedRosterRepository};
}

// Direct re-exports for convenience
pub use lifecycle::RosterService;
pub use models::{Assignment, AssignmentStatus, Event, EventKind, Role};
