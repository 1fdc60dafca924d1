//! Roster generation engine
//!
//! Given a target month, produces one event per qualifying weekly date and
//! fills each event's roles under monthly caps, a minimum-gap rule, fatigue
//! and fairness scoring, and a fixed rotation for one role.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RosterGenerator                        │
//! │                                                              │
//! │  calendar ──► dates ──► for each date without an event:      │
//! │                          ┌───────────────┐                   │
//! │                          │ rotation role │──► Rotation       │
//! │                          ├───────────────┤                   │
//! │                          │ other roles   │──► pick_best      │
//! │                          └───────┬───────┘      (scoring)    │
//! │                                  ▼                           │
//! │                    GenerationContext::commit                 │
//! │                                  ▼                           │
//! │                    RosterRepository::insert_event            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`calendar`] - Month arithmetic and candidate date enumeration
//! - [`context`] - Per-run mutable counters and hard cap filters
//! - [`scoring`] - Penalty and bonus terms
//! - [`rotation`] - Round-robin selection for the rotation role
//! - [`generator`] - The generation loop and `pick_best`
//! - [`error`] - Scheduler error types
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rota::scheduler::{RosterGenerator, YearMonth};
//!
//! let report = RosterGenerator::new(&config, &repo).generate(YearMonth::new(2026, 2)?)?;
//! for (date, slot) in report.degraded_slots() {
//!     println!("{date}: {} needs attention", slot.role);
//! }
//! ```

pub mod calendar;
pub mod context;
pub mod error;
pub mod generator;
pub mod rotation;
pub mod scoring;

use serde::Serialize;

pub use calendar::YearMonth;
pub use context::{GapRule, GenerationContext, Slot};
pub use error::{SchedulerError, SchedulerResult};
pub use generator::{pick_best, DateOutcome, GenerationReport, RosterGenerator, SlotOutcome};
pub use rotation::Rotation;
pub use scoring::ScoreBreakdown;

/// Which filter pass produced a slot's occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// Passed every filter
    Preferred,
    /// Only the minimum-gap rule was relaxed
    GapRelaxed,
    /// Rotation role only: chosen on availability and caps alone
    FatigueRelaxed,
    /// Last resort: a monthly cap was exceeded
    OverCap,
    /// Nobody could be found; the slot holds the placeholder
    Placeholder,
    /// Intentionally left for volunteers
    LeftOpen,
}

impl SelectionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::GapRelaxed => "gap_relaxed",
            Self::FatigueRelaxed => "fatigue_relaxed",
            Self::OverCap => "over_cap",
            Self::Placeholder => "placeholder",
            Self::LeftOpen => "left_open",
        }
    }
}
