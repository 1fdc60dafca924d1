//! Assignment lifecycle state machine
//!
//! Assignments move between `pending`, `confirmed` and `needs_coverage`;
//! `cover` and `swapped_with` decorate any state. Every accepted action is
//! all-or-nothing on one assignment, or on two for a swap.
//!
//! # Modules
//!
//! - [`machine`] - Pure transition rules over in-memory assignments
//! - [`handoff`] - Single-use hand-off token generation
//! - [`service`] - [`RosterService`], the facade that loads, transitions,
//!   persists and produces notifications
//!
//! ```text
//!                confirm
//!   pending ───────────────► confirmed
//!      │                        │
//!      │ decline        decline │
//!      ▼                        ▼
//!   needs_coverage ◄────────────┘
//!      │
//!      │ pick up / redeem token
//!      ▼
//!   confirmed (cover set)
//! ```

pub mod handoff;
pub mod machine;
pub mod service;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::error::{ErrorCategory, RotaErrorTrait};
use crate::models::{ActionKind, Assignment, AssignmentRef, HandoffToken, Occupant};
use crate::notifications::Notification;
use crate::storage::StorageError;

pub use handoff::generate_token;
pub use service::{Clock, FixedClock, RosterService, SystemClock};

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Who is performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub name: String,
    pub is_manager: bool,
}

impl Actor {
    pub fn person(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_manager: false,
        }
    }

    pub fn manager(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_manager: true,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_manager {
            write!(f, "{} (manager)", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// An operation requested against one assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Confirm,
    Decline,
    Volunteer,
    PickUp,
    /// Trade the actor's assignment at `offer` for the target slot
    Swap { offer: AssignmentRef },
    /// Replace the slot's occupant
    Reassign { person: Occupant },
    Undo,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Confirm => ActionKind::Confirm,
            Self::Decline => ActionKind::Decline,
            Self::Volunteer => ActionKind::Volunteer,
            Self::PickUp => ActionKind::PickUp,
            Self::Swap { .. } => ActionKind::Swap,
            Self::Reassign { .. } => ActionKind::Reassign,
            Self::Undo => ActionKind::Undo,
        }
    }
}

/// Result of an accepted action
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// The target assignment as persisted
    pub assignment: Assignment,
    /// The other side of a swap
    pub counterpart: Option<Assignment>,
    /// Hand-off token issued by a decline
    pub token: Option<HandoffToken>,
    /// Alerts for the notifier gateway, already past the commit
    pub notifications: Vec<Notification>,
}

impl ActionOutcome {
    pub fn new(assignment: Assignment) -> Self {
        Self {
            assignment,
            counterpart: None,
            token: None,
            notifications: Vec::new(),
        }
    }
}

/// Why an action's precondition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// Actor is neither a manager nor the assigned person
    NotOwner,
    /// Volunteering needs a vacant slot
    SlotNotVacant,
    /// Managers assign through reassign, not volunteer
    ManagerCannotVolunteer,
    /// Pick-up needs the slot to be in needs_coverage
    NotNeedingCoverage,
    /// Nobody can cover their own slot
    OwnSlot,
    /// Swap offer is not held by the actor
    OfferNotOwned,
    /// Swap offer must be pending or confirmed
    OfferNotSwappable,
    /// Swap offer must be dated today or later
    OfferInPast,
    /// Swap offer and target fall on the same date
    SameDate,
    /// Swap target has no real person to trade with
    TargetVacant,
    /// Actor already holds the target slot
    AlreadyAssigned,
    /// Reassign to someone outside the roster
    UnknownPerson,
    /// Non-managers can only reassign themselves into a vacant slot
    ReassignNotPermitted,
    /// No recorded mutation to undo
    NothingToUndo,
    /// An event already exists on the requested date
    DateTaken,
    /// Unavailability period ends before it starts
    InvalidPeriod,
    /// Month-wide maintenance is reserved for managers
    ManagerOnly,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotOwner => "not_owner",
            Self::SlotNotVacant => "slot_not_vacant",
            Self::ManagerCannotVolunteer => "manager_cannot_volunteer",
            Self::NotNeedingCoverage => "not_needing_coverage",
            Self::OwnSlot => "own_slot",
            Self::OfferNotOwned => "offer_not_owned",
            Self::OfferNotSwappable => "offer_not_swappable",
            Self::OfferInPast => "offer_in_past",
            Self::SameDate => "same_date",
            Self::TargetVacant => "target_vacant",
            Self::AlreadyAssigned => "already_assigned",
            Self::UnknownPerson => "unknown_person",
            Self::ReassignNotPermitted => "reassign_not_permitted",
            Self::NothingToUndo => "nothing_to_undo",
            Self::DateTaken => "date_taken",
            Self::InvalidPeriod => "invalid_period",
            Self::ManagerOnly => "manager_only",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotOwner => "only the assigned person or a manager can do that",
            Self::SlotNotVacant => "slot is not open",
            Self::ManagerCannotVolunteer => "managers assign people with reassign",
            Self::NotNeedingCoverage => "slot does not need coverage",
            Self::OwnSlot => "cannot cover your own slot",
            Self::OfferNotOwned => "offered slot is not yours",
            Self::OfferNotSwappable => "offered slot must be pending or confirmed",
            Self::OfferInPast => "offered slot is in the past",
            Self::SameDate => "both slots are on the same date",
            Self::TargetVacant => "nobody to swap with",
            Self::AlreadyAssigned => "already assigned to this slot",
            Self::UnknownPerson => "person is not on the roster",
            Self::ReassignNotPermitted => "only managers can reassign a filled slot",
            Self::NothingToUndo => "nothing to undo",
            Self::DateTaken => "an event already exists on that date",
            Self::InvalidPeriod => "period ends before it starts",
            Self::ManagerOnly => "only managers can do that",
        };
        f.write_str(msg)
    }
}

/// Why a hand-off token cannot be redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenRejection {
    Unknown,
    AlreadyUsed,
    /// The assignment was covered or restored since the token was issued
    NoLongerNeeded,
    /// The redeemer holds the slot
    OwnSlot,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Unknown => "unknown token",
            Self::AlreadyUsed => "token already used",
            Self::NoLongerNeeded => "shift no longer needs coverage",
            Self::OwnSlot => "cannot cover your own slot",
        };
        f.write_str(msg)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Precondition failed; nothing was changed
    #[error("action rejected: {0}")]
    Rejected(RejectReason),

    /// Token reuse or stale redemption; terminal
    #[error("invalid hand-off token: {0}")]
    TokenInvalid(TokenRejection),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LifecycleError {
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected(reason)
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl RotaErrorTrait for LifecycleError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_recoverable(),
            Self::Rejected(_) | Self::TokenInvalid(_) | Self::NotFound(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected(_) => ErrorCategory::Rejected,
            Self::TokenInvalid(_) => ErrorCategory::Token,
            Self::NotFound(_) | Self::Storage(_) => ErrorCategory::Storage,
        }
    }
}
