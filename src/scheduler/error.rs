//! Error types for the scheduler module

use std::fmt;

use crate::error::{ErrorCategory, RotaErrorTrait};
use crate::storage::StorageError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
///
/// An unfillable slot is never an error: it degrades to the placeholder.
#[derive(Debug)]
pub enum SchedulerError {
    /// Year/month pair does not name a calendar month
    InvalidMonth { year: i32, month: u32 },

    /// Text could not be parsed as `YYYY-MM`
    InvalidMonthFormat { value: String },

    /// The roster has nobody to schedule
    EmptyRoster,

    /// Record store failure while reading history or committing a date
    Storage(StorageError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMonth { year, month } => {
                write!(f, "Invalid month {}-{:02}. Month must be 1-12", year, month)
            }
            Self::InvalidMonthFormat { value } => {
                write!(f, "Invalid month '{}'. Expected YYYY-MM", value)
            }
            Self::EmptyRoster => write!(f, "Roster has no members to schedule"),
            Self::Storage(e) => write!(f, "Storage failure during generation: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for SchedulerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl SchedulerError {
    /// Create an invalid month error
    pub fn invalid_month(year: i32, month: u32) -> Self {
        Self::InvalidMonth { year, month }
    }

    /// Create an invalid month format error
    pub fn invalid_month_format(value: impl Into<String>) -> Self {
        Self::InvalidMonthFormat {
            value: value.into(),
        }
    }
}

impl RotaErrorTrait for SchedulerError {
    fn is_recoverable(&self) -> bool {
        // a half-generated month resumes safely, so storage hiccups are retriable
        match self {
            Self::Storage(e) => e.is_recoverable(),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(_) => ErrorCategory::Storage,
            Self::EmptyRoster => ErrorCategory::Config,
            _ => ErrorCategory::Scheduler,
        }
    }
}
