//! Record store for events, assignments, hand-off tokens and unavailability
//!
//! The core consumes storage through the [`RosterRepository`] trait. Two
//! implementations are provided: SQLite for the CLI and an in-memory store for
//! tests and embedding.

pub mod repository;

pub use repository::{
    MemoryRosterRepository, RosterRepository, SharedRosterRepository, SqliteRosterRepository,
};

use thiserror::Error;

use crate::error::{ErrorCategory, RotaErrorTrait};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Record store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// At most one event may exist per date
    #[error("an event already exists on {0}")]
    DuplicateDate(chrono::NaiveDate),

    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("token not found")]
    TokenNotFound,

    #[error("token already used")]
    TokenUsed,

    #[error("token already exists")]
    DuplicateToken,

    /// The assignment changed since it was read
    #[error("assignment {assignment_id} was modified concurrently")]
    Conflict { assignment_id: i64 },

    /// A stored value could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl RotaErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::Io(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

impl From<crate::models::ParseModelError> for StorageError {
    fn from(err: crate::models::ParseModelError) -> Self {
        Self::Corrupt(err.to_string())
    }
}
