//! Repository pattern for the roster record store
//!
//! The generation engine and the lifecycle service only ever talk to a
//! [`RosterRepository`]. Implementations must guarantee:
//! - at most one event per date (`insert_event` fails with `DuplicateDate`)
//! - an event's assignments are created with it and deleted with it
//! - `update_assignments` is all-or-nothing and rejects stale versions
//! - `redeem_token` marks the token used and saves the assignment atomically
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          RosterGenerator / RosterService / CLI              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   RosterRepository trait                    │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                        │
//!                    ▼                        ▼
//!          ┌─────────────────┐      ┌─────────────────┐
//!          │     SQLite      │      │    In-memory    │
//!          └─────────────────┘      └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rota::storage::{RosterRepository, SqliteRosterRepository};
//!
//! let repo = SqliteRosterRepository::new("data/roster.db")?;
//! let event = repo.get_event_by_date(date)?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::{StorageError, StorageResult};
use crate::availability::RecurrencePattern;
use crate::models::{
    Assignment, AssignmentRef, AssignmentStatus, Event, EventKind, HandoffToken, NewEvent,
    NewUnavailability, Occupant, Role, Unavailability,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Repository Trait
// ============================================================================

/// Record store consumed by the roster core
pub trait RosterRepository: Send + Sync {
    /// Create an event together with its assignments
    fn insert_event(&self, event: &NewEvent) -> StorageResult<Event>;

    fn get_event(&self, id: i64) -> StorageResult<Option<Event>>;

    fn get_event_by_date(&self, date: NaiveDate) -> StorageResult<Option<Event>>;

    /// Events with `start <= date <= end`, ascending by date
    fn events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<Vec<Event>>;

    /// Every stored event, ascending by date
    fn all_events(&self) -> StorageResult<Vec<Event>>;

    /// Delete an event, its assignments and their tokens
    fn delete_event(&self, id: i64) -> StorageResult<bool>;

    /// Delete every event in the range; returns the number removed
    fn delete_events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<usize>;

    fn set_event_title(&self, id: i64, title: Option<&str>) -> StorageResult<()>;

    fn set_event_notes(&self, id: i64, notes: Option<&str>) -> StorageResult<()>;

    fn get_assignment(&self, id: i64) -> StorageResult<Option<Assignment>>;

    /// Resolve a date + position address
    fn find_assignment(&self, reference: AssignmentRef) -> StorageResult<Option<Assignment>> {
        Ok(self.get_event_by_date(reference.date)?.and_then(|event| {
            event
                .assignments
                .into_iter()
                .find(|a| a.position == reference.position)
        }))
    }

    /// Save mutated assignments in one transaction
    ///
    /// Each assignment's `version` must match the stored one; the returned
    /// copies carry the incremented version.
    fn update_assignments(&self, assignments: &[Assignment]) -> StorageResult<Vec<Assignment>>;

    fn insert_token(&self, token: &HandoffToken) -> StorageResult<()>;

    /// Save `assignment` and store `token` for it in one transaction
    fn save_with_token(
        &self,
        assignment: &Assignment,
        token: &HandoffToken,
    ) -> StorageResult<Assignment>;

    fn get_token(&self, token: &str) -> StorageResult<Option<HandoffToken>>;

    fn tokens_for_assignment(&self, assignment_id: i64) -> StorageResult<Vec<HandoffToken>>;

    /// Mark `token` used and save `assignment` in one transaction
    fn redeem_token(&self, token: &str, assignment: &Assignment) -> StorageResult<Assignment>;

    fn add_unavailability(&self, period: &NewUnavailability) -> StorageResult<Unavailability>;

    /// Stored periods, optionally for one person, ordered by start date
    fn list_unavailability(&self, person: Option<&str>) -> StorageResult<Vec<Unavailability>>;

    fn remove_unavailability(&self, id: i64) -> StorageResult<bool>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> StorageResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| StorageError::Corrupt(format!("invalid date '{value}'")))
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::Corrupt(format!("invalid timestamp '{value}'")))
}

struct EventRow {
    id: i64,
    date: String,
    kind: String,
    title: Option<String>,
    notes: Option<String>,
}

struct AssignmentRow {
    id: i64,
    event_id: i64,
    position: i64,
    role: String,
    person: String,
    status: String,
    cover: Option<String>,
    swapped_with: Option<String>,
    history: String,
    version: i64,
}

impl AssignmentRow {
    const COLUMNS: &'static str =
        "id, event_id, position, role, person, status, cover, swapped_with, history, version";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_id: row.get(1)?,
            position: row.get(2)?,
            role: row.get(3)?,
            person: row.get(4)?,
            status: row.get(5)?,
            cover: row.get(6)?,
            swapped_with: row.get(7)?,
            history: row.get(8)?,
            version: row.get(9)?,
        })
    }

    fn into_assignment(self) -> StorageResult<Assignment> {
        Ok(Assignment {
            id: self.id,
            event_id: self.event_id,
            position: usize::try_from(self.position)
                .map_err(|_| StorageError::Corrupt(format!("negative position {}", self.position)))?,
            role: self.role.parse::<Role>()?,
            person: self.person.parse::<Occupant>()?,
            status: self.status.parse::<AssignmentStatus>()?,
            cover: self.cover,
            swapped_with: self.swapped_with,
            history: serde_json::from_str(&self.history)?,
            version: u64::try_from(self.version).unwrap_or_default(),
        })
    }
}

struct UnavailabilityRow {
    id: i64,
    person: String,
    start: String,
    end: String,
    reason: Option<String>,
    pattern: Option<String>,
}

impl UnavailabilityRow {
    fn into_unavailability(self) -> StorageResult<Unavailability> {
        Ok(Unavailability {
            id: self.id,
            person: self.person,
            start: parse_date(&self.start)?,
            end: parse_date(&self.end)?,
            reason: self.reason,
            pattern: self
                .pattern
                .map(|p| p.parse::<RecurrencePattern>())
                .transpose()?,
        })
    }
}

/// SQLite implementation of RosterRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteRosterRepository {
    conn: Mutex<Connection>,
}

impl SqliteRosterRepository {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self::init(conn)?;
        tracing::info!(path = %path.display(), "SQLite roster store initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn create_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL UNIQUE,
                    kind TEXT NOT NULL,
                    title TEXT,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS assignments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    role TEXT NOT NULL,
                    person TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    cover TEXT,
                    swapped_with TEXT,
                    history TEXT NOT NULL DEFAULT '[]',
                    version INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (event_id, position)
                );

                CREATE INDEX IF NOT EXISTS idx_assignments_event
                    ON assignments(event_id);

                CREATE TABLE IF NOT EXISTS handoff_tokens (
                    token TEXT PRIMARY KEY,
                    assignment_id INTEGER NOT NULL REFERENCES assignments(id) ON DELETE CASCADE,
                    used INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_handoff_tokens_assignment
                    ON handoff_tokens(assignment_id);

                CREATE TABLE IF NOT EXISTS unavailability (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    person TEXT NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    reason TEXT,
                    pattern TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_unavailability_person
                    ON unavailability(person);
                "#,
        )?;

        Ok(())
    }

    fn load_assignments(conn: &Connection, event_id: i64) -> StorageResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {} FROM assignments WHERE event_id = ?1 ORDER BY position",
            AssignmentRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![event_id], AssignmentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }

    fn select_events(
        conn: &Connection,
        filter: &str,
        args: &[&dyn ToSql],
    ) -> StorageResult<Vec<Event>> {
        let sql = format!("SELECT id, date, kind, title, notes FROM events {filter} ORDER BY date");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok(EventRow {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    kind: row.get(2)?,
                    title: row.get(3)?,
                    notes: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                Ok(Event {
                    id: row.id,
                    date: parse_date(&row.date)?,
                    kind: row.kind.parse::<EventKind>()?,
                    title: row.title,
                    notes: row.notes,
                    assignments: Self::load_assignments(conn, row.id)?,
                })
            })
            .collect()
    }

    fn write_token(conn: &Connection, token: &HandoffToken) -> StorageResult<()> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM handoff_tokens WHERE token = ?1)",
            params![token.token],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StorageError::DuplicateToken);
        }

        conn.execute(
            "INSERT INTO handoff_tokens (token, assignment_id, used, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.token,
                token.assignment_id,
                token.used,
                token.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn write_assignment(conn: &Connection, assignment: &Assignment) -> StorageResult<Assignment> {
        let history = serde_json::to_string(&assignment.history)?;
        let changed = conn.execute(
            r#"
                UPDATE assignments
                SET person = ?1, status = ?2, cover = ?3, swapped_with = ?4,
                    history = ?5, version = version + 1
                WHERE id = ?6 AND version = ?7
                "#,
            params![
                assignment.person.to_string(),
                assignment.status.as_str(),
                assignment.cover,
                assignment.swapped_with,
                history,
                assignment.id,
                assignment.version as i64,
            ],
        )?;

        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM assignments WHERE id = ?1)",
                params![assignment.id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StorageError::Conflict {
                    assignment_id: assignment.id,
                }
            } else {
                StorageError::AssignmentNotFound(assignment.id.to_string())
            });
        }

        let mut saved = assignment.clone();
        saved.version += 1;
        Ok(saved)
    }

    fn update_event_column(&self, id: i64, column: &str, value: Option<&str>) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        let sql = format!("UPDATE events SET {column} = ?1 WHERE id = ?2");
        let changed = conn.execute(&sql, params![value, id])?;
        if changed == 0 {
            return Err(StorageError::EventNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl RosterRepository for SqliteRosterRepository {
    fn insert_event(&self, event: &NewEvent) -> StorageResult<Event> {
        let mut conn = self.conn.lock()?;
        let date = format_date(event.date);

        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE date = ?1)",
            params![date],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StorageError::DuplicateDate(event.date));
        }

        tx.execute(
            "INSERT INTO events (date, kind, title, notes) VALUES (?1, ?2, ?3, ?4)",
            params![date, event.kind.as_str(), event.title, event.notes],
        )?;
        let event_id = tx.last_insert_rowid();

        for (position, assignment) in event.assignments.iter().enumerate() {
            tx.execute(
                r#"
                    INSERT INTO assignments (event_id, position, role, person, status)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                params![
                    event_id,
                    position as i64,
                    assignment.role.id(),
                    assignment.person.to_string(),
                    assignment.status.as_str(),
                ],
            )?;
        }
        tx.commit()?;

        Self::select_events(&conn, "WHERE id = ?1", &[&event_id])?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::EventNotFound(event_id.to_string()))
    }

    fn get_event(&self, id: i64) -> StorageResult<Option<Event>> {
        let conn = self.conn.lock()?;
        Ok(Self::select_events(&conn, "WHERE id = ?1", &[&id])?
            .into_iter()
            .next())
    }

    fn get_event_by_date(&self, date: NaiveDate) -> StorageResult<Option<Event>> {
        let conn = self.conn.lock()?;
        let date = format_date(date);
        Ok(Self::select_events(&conn, "WHERE date = ?1", &[&date])?
            .into_iter()
            .next())
    }

    fn events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<Vec<Event>> {
        let conn = self.conn.lock()?;
        let (start, end) = (format_date(start), format_date(end));
        Self::select_events(&conn, "WHERE date >= ?1 AND date <= ?2", &[&start, &end])
    }

    fn all_events(&self) -> StorageResult<Vec<Event>> {
        let conn = self.conn.lock()?;
        Self::select_events(&conn, "", &[])
    }

    fn delete_event(&self, id: i64) -> StorageResult<bool> {
        let conn = self.conn.lock()?;
        let deleted = conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn delete_events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<usize> {
        let conn = self.conn.lock()?;
        let deleted = conn.execute(
            "DELETE FROM events WHERE date >= ?1 AND date <= ?2",
            params![format_date(start), format_date(end)],
        )?;
        Ok(deleted)
    }

    fn set_event_title(&self, id: i64, title: Option<&str>) -> StorageResult<()> {
        self.update_event_column(id, "title", title)
    }

    fn set_event_notes(&self, id: i64, notes: Option<&str>) -> StorageResult<()> {
        self.update_event_column(id, "notes", notes)
    }

    fn get_assignment(&self, id: i64) -> StorageResult<Option<Assignment>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {} FROM assignments WHERE id = ?1",
            AssignmentRow::COLUMNS
        );
        let row = conn
            .query_row(&sql, params![id], AssignmentRow::from_row)
            .optional()?;
        row.map(AssignmentRow::into_assignment).transpose()
    }

    fn update_assignments(&self, assignments: &[Assignment]) -> StorageResult<Vec<Assignment>> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let saved = assignments
            .iter()
            .map(|a| Self::write_assignment(&tx, a))
            .collect::<StorageResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(saved)
    }

    fn insert_token(&self, token: &HandoffToken) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        Self::write_token(&conn, token)
    }

    fn save_with_token(
        &self,
        assignment: &Assignment,
        token: &HandoffToken,
    ) -> StorageResult<Assignment> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let saved = Self::write_assignment(&tx, assignment)?;
        Self::write_token(&tx, token)?;
        tx.commit()?;
        Ok(saved)
    }

    fn get_token(&self, token: &str) -> StorageResult<Option<HandoffToken>> {
        let conn = self.conn.lock()?;
        let row: Option<(String, i64, bool, String)> = conn
            .query_row(
                "SELECT token, assignment_id, used, created_at FROM handoff_tokens WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(token, assignment_id, used, created_at)| {
            Ok(HandoffToken {
                token,
                assignment_id,
                used,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    fn tokens_for_assignment(&self, assignment_id: i64) -> StorageResult<Vec<HandoffToken>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT token, assignment_id, used, created_at FROM handoff_tokens
             WHERE assignment_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map(params![assignment_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(token, assignment_id, used, created_at)| {
                Ok(HandoffToken {
                    token,
                    assignment_id,
                    used,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn redeem_token(&self, token: &str, assignment: &Assignment) -> StorageResult<Assignment> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        let row: Option<(i64, bool)> = tx
            .query_row(
                "SELECT assignment_id, used FROM handoff_tokens WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (assignment_id, used) = row.ok_or(StorageError::TokenNotFound)?;
        if used {
            return Err(StorageError::TokenUsed);
        }
        if assignment_id != assignment.id {
            return Err(StorageError::Corrupt(format!(
                "token is bound to assignment {assignment_id}, not {}",
                assignment.id
            )));
        }

        tx.execute(
            "UPDATE handoff_tokens SET used = 1 WHERE token = ?1",
            params![token],
        )?;
        let saved = Self::write_assignment(&tx, assignment)?;
        tx.commit()?;
        Ok(saved)
    }

    fn add_unavailability(&self, period: &NewUnavailability) -> StorageResult<Unavailability> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
                INSERT INTO unavailability (person, start_date, end_date, reason, pattern)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            params![
                period.person,
                format_date(period.start),
                format_date(period.end),
                period.reason,
                period.pattern.map(|p| p.to_string()),
            ],
        )?;

        Ok(Unavailability {
            id: conn.last_insert_rowid(),
            person: period.person.clone(),
            start: period.start,
            end: period.end,
            reason: period.reason.clone(),
            pattern: period.pattern,
        })
    }

    fn list_unavailability(&self, person: Option<&str>) -> StorageResult<Vec<Unavailability>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            r#"
                SELECT id, person, start_date, end_date, reason, pattern
                FROM unavailability
                WHERE ?1 IS NULL OR person = ?1
                ORDER BY start_date, id
                "#,
        )?;
        let rows = stmt
            .query_map(params![person], |row| {
                Ok(UnavailabilityRow {
                    id: row.get(0)?,
                    person: row.get(1)?,
                    start: row.get(2)?,
                    end: row.get(3)?,
                    reason: row.get(4)?,
                    pattern: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(UnavailabilityRow::into_unavailability)
            .collect()
    }

    fn remove_unavailability(&self, id: i64) -> StorageResult<bool> {
        let conn = self.conn.lock()?;
        let deleted = conn.execute("DELETE FROM unavailability WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// In-memory Implementation
// ============================================================================

#[derive(Default)]
struct MemoryState {
    events: BTreeMap<NaiveDate, Event>,
    tokens: HashMap<String, HandoffToken>,
    unavailability: BTreeMap<i64, Unavailability>,
    next_event_id: i64,
    next_assignment_id: i64,
    next_unavailability_id: i64,
}

impl MemoryState {
    fn assignment(&self, id: i64) -> Option<&Assignment> {
        self.events
            .values()
            .flat_map(|e| e.assignments.iter())
            .find(|a| a.id == id)
    }

    fn assignment_mut(&mut self, id: i64) -> Option<&mut Assignment> {
        self.events
            .values_mut()
            .flat_map(|e| e.assignments.iter_mut())
            .find(|a| a.id == id)
    }

    fn event_mut(&mut self, id: i64) -> Option<&mut Event> {
        self.events.values_mut().find(|e| e.id == id)
    }

    /// Version check for every assignment before anything is written
    fn check_versions(&self, assignments: &[Assignment]) -> StorageResult<()> {
        for assignment in assignments {
            let stored = self
                .assignment(assignment.id)
                .ok_or_else(|| StorageError::AssignmentNotFound(assignment.id.to_string()))?;
            if stored.version != assignment.version {
                return Err(StorageError::Conflict {
                    assignment_id: assignment.id,
                });
            }
        }
        Ok(())
    }

    fn check_token(&self, token: &HandoffToken) -> StorageResult<()> {
        if self.assignment(token.assignment_id).is_none() {
            return Err(StorageError::AssignmentNotFound(
                token.assignment_id.to_string(),
            ));
        }
        if self.tokens.contains_key(&token.token) {
            return Err(StorageError::DuplicateToken);
        }
        Ok(())
    }

    fn write(&mut self, assignment: &Assignment) -> StorageResult<Assignment> {
        let stored = self
            .assignment_mut(assignment.id)
            .ok_or_else(|| StorageError::AssignmentNotFound(assignment.id.to_string()))?;
        stored.person = assignment.person.clone();
        stored.status = assignment.status;
        stored.cover = assignment.cover.clone();
        stored.swapped_with = assignment.swapped_with.clone();
        stored.history = assignment.history.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    fn drop_tokens_of(&mut self, event: &Event) {
        let ids: Vec<i64> = event.assignments.iter().map(|a| a.id).collect();
        self.tokens.retain(|_, t| !ids.contains(&t.assignment_id));
    }
}

/// In-memory implementation of RosterRepository
///
/// Useful for tests and for embedding without a database file.
#[derive(Default)]
pub struct MemoryRosterRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRosterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RosterRepository for MemoryRosterRepository {
    fn insert_event(&self, event: &NewEvent) -> StorageResult<Event> {
        let mut state = self.state.write()?;
        if state.events.contains_key(&event.date) {
            return Err(StorageError::DuplicateDate(event.date));
        }

        state.next_event_id += 1;
        let event_id = state.next_event_id;

        let mut assignments = Vec::with_capacity(event.assignments.len());
        for (position, new) in event.assignments.iter().enumerate() {
            state.next_assignment_id += 1;
            assignments.push(Assignment {
                id: state.next_assignment_id,
                event_id,
                position,
                role: new.role,
                person: new.person.clone(),
                status: new.status,
                cover: None,
                swapped_with: None,
                history: Vec::new(),
                version: 0,
            });
        }

        let stored = Event {
            id: event_id,
            date: event.date,
            kind: event.kind,
            title: event.title.clone(),
            notes: event.notes.clone(),
            assignments,
        };
        state.events.insert(event.date, stored.clone());
        Ok(stored)
    }

    fn get_event(&self, id: i64) -> StorageResult<Option<Event>> {
        let state = self.state.read()?;
        Ok(state.events.values().find(|e| e.id == id).cloned())
    }

    fn get_event_by_date(&self, date: NaiveDate) -> StorageResult<Option<Event>> {
        let state = self.state.read()?;
        Ok(state.events.get(&date).cloned())
    }

    fn events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<Vec<Event>> {
        if start > end {
            return Ok(Vec::new());
        }
        let state = self.state.read()?;
        Ok(state.events.range(start..=end).map(|(_, e)| e.clone()).collect())
    }

    fn all_events(&self) -> StorageResult<Vec<Event>> {
        let state = self.state.read()?;
        Ok(state.events.values().cloned().collect())
    }

    fn delete_event(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.write()?;
        let date = state.events.values().find(|e| e.id == id).map(|e| e.date);
        let Some(date) = date else {
            return Ok(false);
        };
        if let Some(event) = state.events.remove(&date) {
            state.drop_tokens_of(&event);
        }
        Ok(true)
    }

    fn delete_events_between(&self, start: NaiveDate, end: NaiveDate) -> StorageResult<usize> {
        if start > end {
            return Ok(0);
        }
        let mut state = self.state.write()?;
        let dates: Vec<NaiveDate> = state.events.range(start..=end).map(|(d, _)| *d).collect();
        for date in &dates {
            if let Some(event) = state.events.remove(date) {
                state.drop_tokens_of(&event);
            }
        }
        Ok(dates.len())
    }

    fn set_event_title(&self, id: i64, title: Option<&str>) -> StorageResult<()> {
        let mut state = self.state.write()?;
        let event = state
            .event_mut(id)
            .ok_or_else(|| StorageError::EventNotFound(id.to_string()))?;
        event.title = title.map(String::from);
        Ok(())
    }

    fn set_event_notes(&self, id: i64, notes: Option<&str>) -> StorageResult<()> {
        let mut state = self.state.write()?;
        let event = state
            .event_mut(id)
            .ok_or_else(|| StorageError::EventNotFound(id.to_string()))?;
        event.notes = notes.map(String::from);
        Ok(())
    }

    fn get_assignment(&self, id: i64) -> StorageResult<Option<Assignment>> {
        let state = self.state.read()?;
        Ok(state.assignment(id).cloned())
    }

    fn update_assignments(&self, assignments: &[Assignment]) -> StorageResult<Vec<Assignment>> {
        let mut state = self.state.write()?;
        state.check_versions(assignments)?;
        assignments.iter().map(|a| state.write(a)).collect()
    }

    fn insert_token(&self, token: &HandoffToken) -> StorageResult<()> {
        let mut state = self.state.write()?;
        state.check_token(token)?;
        state.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    fn save_with_token(
        &self,
        assignment: &Assignment,
        token: &HandoffToken,
    ) -> StorageResult<Assignment> {
        let mut state = self.state.write()?;
        state.check_versions(std::slice::from_ref(assignment))?;
        state.check_token(token)?;
        let saved = state.write(assignment)?;
        state.tokens.insert(token.token.clone(), token.clone());
        Ok(saved)
    }

    fn get_token(&self, token: &str) -> StorageResult<Option<HandoffToken>> {
        let state = self.state.read()?;
        Ok(state.tokens.get(token).cloned())
    }

    fn tokens_for_assignment(&self, assignment_id: i64) -> StorageResult<Vec<HandoffToken>> {
        let state = self.state.read()?;
        let mut tokens: Vec<HandoffToken> = state
            .tokens
            .values()
            .filter(|t| t.assignment_id == assignment_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    fn redeem_token(&self, token: &str, assignment: &Assignment) -> StorageResult<Assignment> {
        let mut state = self.state.write()?;
        let stored = state.tokens.get(token).ok_or(StorageError::TokenNotFound)?;
        if stored.used {
            return Err(StorageError::TokenUsed);
        }
        if stored.assignment_id != assignment.id {
            return Err(StorageError::Corrupt(format!(
                "token is bound to assignment {}, not {}",
                stored.assignment_id, assignment.id
            )));
        }

        state.check_versions(std::slice::from_ref(assignment))?;
        let saved = state.write(assignment)?;
        if let Some(stored) = state.tokens.get_mut(token) {
            stored.used = true;
        }
        Ok(saved)
    }

    fn add_unavailability(&self, period: &NewUnavailability) -> StorageResult<Unavailability> {
        let mut state = self.state.write()?;
        state.next_unavailability_id += 1;
        let stored = Unavailability {
            id: state.next_unavailability_id,
            person: period.person.clone(),
            start: period.start,
            end: period.end,
            reason: period.reason.clone(),
            pattern: period.pattern,
        };
        state.unavailability.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn list_unavailability(&self, person: Option<&str>) -> StorageResult<Vec<Unavailability>> {
        let state = self.state.read()?;
        let mut periods: Vec<Unavailability> = state
            .unavailability
            .values()
            .filter(|p| person.map_or(true, |name| p.person == name))
            .cloned()
            .collect();
        periods.sort_by_key(|p| (p.start, p.id));
        Ok(periods)
    }

    fn remove_unavailability(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.write()?;
        Ok(state.unavailability.remove(&id).is_some())
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared repository handle
pub type SharedRosterRepository = Arc<dyn RosterRepository>;

/// Create a shared SQLite repository
pub fn create_sqlite_repository(path: impl AsRef<Path>) -> StorageResult<SharedRosterRepository> {
    Ok(Arc::new(SqliteRosterRepository::new(path)?))
}

/// Create a shared in-memory repository
pub fn create_memory_repository() -> SharedRosterRepository {
    Arc::new(MemoryRosterRepository::new())
}

// ============================================================================
// Tests
// ============================================================================
