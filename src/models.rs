// Core data structures for the roster: events, role slots, tokens

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::availability::RecurrencePattern;

/// Names that can never be used for a roster member because they collide
/// with the slot sentinels.
pub const RESERVED_NAMES: [&str; 3] = ["TBD", "Open", "Select Helper"];

/// Error returned when a model value cannot be parsed from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseModelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseModelError {
    fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

// ============================================================================
// Roles and event kinds
// ============================================================================

/// Which weekly family a role or event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFamily {
    /// Computer + cameras (e.g. the Sunday service)
    Primary,
    /// Leader + helper (e.g. the Friday study)
    Secondary,
}

/// A role slot within an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "computer")]
    Computer,
    #[serde(rename = "camera1")]
    Camera1,
    #[serde(rename = "camera2")]
    Camera2,
    #[serde(rename = "leader")]
    Leader,
    #[serde(rename = "helper")]
    Helper,
}

impl Role {
    pub fn all() -> [Self; 5] {
        [
            Self::Computer,
            Self::Camera1,
            Self::Camera2,
            Self::Leader,
            Self::Helper,
        ]
    }

    /// Human-readable name, as shown on the roster
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Computer => "Computer",
            Self::Camera1 => "Camera 1",
            Self::Camera2 => "Camera 2",
            Self::Leader => "Leader",
            Self::Helper => "Helper",
        }
    }

    /// Stable identifier used in storage and configuration
    pub fn id(&self) -> &'static str {
        match self {
            Self::Computer => "computer",
            Self::Camera1 => "camera1",
            Self::Camera2 => "camera2",
            Self::Leader => "leader",
            Self::Helper => "helper",
        }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            Self::Computer | Self::Camera1 | Self::Camera2 => EventFamily::Primary,
            Self::Leader | Self::Helper => EventFamily::Secondary,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "computer" | "pc" | "switcher" => Ok(Self::Computer),
            "camera1" | "cam1" => Ok(Self::Camera1),
            "camera2" | "cam2" => Ok(Self::Camera2),
            "leader" => Ok(Self::Leader),
            "helper" => Ok(Self::Helper),
            _ => Err(ParseModelError::new("role", s)),
        }
    }
}

/// Event type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Weekly event of the primary type (computer + two cameras)
    Primary,
    /// Weekly event of the secondary type (leader + helper)
    Secondary,
    /// One-off event with a hand-picked role set
    Custom,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Custom => "custom",
        }
    }

    /// Role slots a freshly created event of this kind carries, in order
    pub fn default_roles(&self) -> Vec<Role> {
        match self {
            Self::Primary => vec![Role::Computer, Role::Camera1, Role::Camera2],
            Self::Secondary => vec![Role::Leader, Role::Helper],
            Self::Custom => Vec::new(),
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Primary => "Sunday Service",
            Self::Secondary => "Bible Study",
            Self::Custom => "Special Event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "sunday" | "a" => Ok(Self::Primary),
            "secondary" | "friday" | "b" => Ok(Self::Secondary),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseModelError::new("event kind", s)),
        }
    }
}

// ============================================================================
// Occupant
// ============================================================================

/// Who holds a role slot
///
/// Stored and serialized as plain text: a roster name, `TBD` or `Open`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Occupant {
    /// A roster member
    Person(String),
    /// Generation could not find anyone for this slot
    Unfilled,
    /// Intentionally left open for volunteers
    Open,
}

impl Occupant {
    pub fn person(name: impl Into<String>) -> Self {
        Self::Person(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Person(name) => Some(name),
            Self::Unfilled | Self::Open => None,
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, Self::Person(_))
    }

    /// True for either sentinel
    pub fn is_vacant(&self) -> bool {
        !self.is_person()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name() == Some(name)
    }
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person(name) => write!(f, "{name}"),
            Self::Unfilled => write!(f, "TBD"),
            Self::Open => write!(f, "Open"),
        }
    }
}

impl FromStr for Occupant {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ParseModelError::new("occupant", s)),
            "TBD" => Ok(Self::Unfilled),
            "Open" | "Select Helper" => Ok(Self::Open),
            name => Ok(Self::Person(name.to_string())),
        }
    }
}

impl From<Occupant> for String {
    fn from(occupant: Occupant) -> Self {
        occupant.to_string()
    }
}

impl TryFrom<String> for Occupant {
    type Error = ParseModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Assignment status and history
// ============================================================================

/// Lifecycle status of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Confirmed,
    NeedsCoverage,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::NeedsCoverage => "needs_coverage",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "needs_coverage" | "swap_needed" => Ok(Self::NeedsCoverage),
            _ => Err(ParseModelError::new("assignment status", s)),
        }
    }
}

/// Kind of mutation recorded in an assignment's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Confirm,
    Decline,
    Volunteer,
    PickUp,
    Swap,
    Reassign,
    Redeem,
    Undo,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Decline => "decline",
            Self::Volunteer => "volunteer",
            Self::PickUp => "pickup",
            Self::Swap => "swap",
            Self::Reassign => "reassign",
            Self::Redeem => "redeem",
            Self::Undo => "undo",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The mutable part of an assignment, captured before each mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub person: Occupant,
    pub status: AssignmentStatus,
    pub cover: Option<String>,
    pub swapped_with: Option<String>,
}

/// One audit-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: ActionKind,
    pub actor: String,
    pub prior: AssignmentSnapshot,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn prior_status(&self) -> AssignmentStatus {
        self.prior.status
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// One role slot within an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub event_id: i64,
    /// Ordinal position within the event, stable for addressing
    pub position: usize,
    pub role: Role,
    pub person: Occupant,
    pub status: AssignmentStatus,
    /// Who actually works the shift when different from `person`
    pub cover: Option<String>,
    /// Previous occupant when the slot was traded
    pub swapped_with: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// Optimistic-lock counter, bumped by every committed update
    pub version: u64,
}

impl Assignment {
    /// The roster member doing the work: the cover if any, else the holder
    pub fn worker(&self) -> Option<&str> {
        self.cover.as_deref().or_else(|| self.person.name())
    }

    pub fn snapshot(&self) -> AssignmentSnapshot {
        AssignmentSnapshot {
            person: self.person.clone(),
            status: self.status,
            cover: self.cover.clone(),
            swapped_with: self.swapped_with.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: AssignmentSnapshot) {
        self.person = snapshot.person;
        self.status = snapshot.status;
        self.cover = snapshot.cover;
        self.swapped_with = snapshot.swapped_with;
    }

    /// Record the current state before mutating it
    pub fn push_history(&mut self, action: ActionKind, actor: &str) {
        let prior = self.snapshot();
        self.history.push(HistoryEntry {
            action,
            actor: actor.to_string(),
            prior,
            at: Utc::now(),
        });
    }
}

/// Assignment data for a slot that is about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub role: Role,
    pub person: Occupant,
    pub status: AssignmentStatus,
}

impl NewAssignment {
    pub fn new(role: Role, person: Occupant) -> Self {
        Self {
            role,
            person,
            status: AssignmentStatus::Pending,
        }
    }

    pub fn open(role: Role) -> Self {
        Self::new(role, Occupant::Open)
    }

    pub fn with_status(mut self, status: AssignmentStatus) -> Self {
        self.status = status;
        self
    }
}

// ============================================================================
// Event
// ============================================================================

/// One calendar occurrence with its role slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub date: NaiveDate,
    pub kind: EventKind,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub assignments: Vec<Assignment>,
}

impl Event {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_title())
    }

    pub fn assignment(&self, position: usize) -> Option<&Assignment> {
        self.assignments.get(position)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.assignments.iter().any(|a| a.role == role)
    }
}

/// Event data for an event that is about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub assignments: Vec<NewAssignment>,
}

impl NewEvent {
    pub fn new(date: NaiveDate, kind: EventKind) -> Self {
        Self {
            date,
            kind,
            title: None,
            notes: None,
            assignments: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_assignment(mut self, assignment: NewAssignment) -> Self {
        self.assignments.push(assignment);
        self
    }
}

/// Stable address of a role slot: the event date plus the slot's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentRef {
    pub date: NaiveDate,
    pub position: usize,
}

impl AssignmentRef {
    pub fn new(date: NaiveDate, position: usize) -> Self {
        Self { date, position }
    }
}

impl fmt::Display for AssignmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.date.format("%Y-%m-%d"), self.position)
    }
}

impl FromStr for AssignmentRef {
    type Err = ParseModelError;

    /// Parses `YYYY-MM-DD#N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, position) = s
            .split_once('#')
            .ok_or_else(|| ParseModelError::new("assignment reference", s))?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| ParseModelError::new("assignment reference", s))?;
        let position = position
            .trim()
            .parse()
            .map_err(|_| ParseModelError::new("assignment reference", s))?;
        Ok(Self { date, position })
    }
}

// ============================================================================
// Hand-off token
// ============================================================================

/// Single-use capability to pick up one assignment that needs coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffToken {
    pub token: String,
    pub assignment_id: i64,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl HandoffToken {
    pub fn new(token: impl Into<String>, assignment_id: i64) -> Self {
        Self {
            token: token.into(),
            assignment_id,
            used: false,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Unavailability
// ============================================================================

/// A stored period during which a person cannot work
///
/// Without a pattern every date in `[start, end]` is blocked; with a pattern
/// only the matching dates inside the range are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailability {
    pub id: i64,
    pub person: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: Option<String>,
    pub pattern: Option<RecurrencePattern>,
}

impl Unavailability {
    pub fn covers(&self, date: NaiveDate) -> bool {
        if date < self.start || date > self.end {
            return false;
        }
        self.pattern.map_or(true, |p| p.matches(date))
    }
}

/// Unavailability data for a period that is about to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUnavailability {
    pub person: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: Option<String>,
    pub pattern: Option<RecurrencePattern>,
}
