//! Unified error handling for the rota crate
//!
//! This module provides a unified error type that consolidates the
//! subsystem errors into a single `Error` enum, while keeping the
//! subsystem errors usable on their own.
//!
//! # Architecture
//!
//! - [`RotaErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all subsystem errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use rota::error::{Error, RotaErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err.description());
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::lifecycle::LifecycleError;
pub use crate::notifications::channels::ChannelError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::storage::StorageError;

/// Common trait for all rota error types
pub trait RotaErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the same call may succeed if retried)
    fn is_recoverable(&self) -> bool;

    /// Short user-facing description
    fn description(&self) -> String {
        self.to_string()
    }

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record store and I/O errors
    Storage,
    /// Roster generation errors
    Scheduler,
    /// An action's precondition failed; nothing was changed
    Rejected,
    /// Hand-off token reuse or stale redemption
    Token,
    /// Notification delivery errors
    Network,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Scheduler => "scheduler",
            Self::Rejected => "rejected",
            Self::Token => "token",
            Self::Network => "network",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the rota crate
#[derive(Error, Debug)]
pub enum Error {
    /// Record store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Roster generation errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Assignment lifecycle errors
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),

    /// Notification channel errors
    #[error("Notification error: {0}")]
    Channel(#[from] ChannelError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RotaErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Lifecycle(e) => e.is_recoverable(),
            Self::Channel(e) => e.is_recoverable(),
            Self::Io(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Lifecycle(e) => e.category(),
            Self::Channel(_) => ErrorCategory::Network,
        }
    }
}

impl Error {
    /// Recover the rota error behind an `anyhow` chain
    ///
    /// Context layers are looked through. Errors from outside the crate are
    /// handed back unchanged.
    pub fn from_anyhow(err: anyhow::Error) -> std::result::Result<Self, anyhow::Error> {
        let err = match err.downcast::<LifecycleError>() {
            Ok(e) => return Ok(e.into()),
            Err(err) => err,
        };
        let err = match err.downcast::<SchedulerError>() {
            Ok(e) => return Ok(e.into()),
            Err(err) => err,
        };
        let err = match err.downcast::<StorageError>() {
            Ok(e) => return Ok(e.into()),
            Err(err) => err,
        };
        let err = match err.downcast::<ChannelError>() {
            Ok(e) => return Ok(e.into()),
            Err(err) => err,
        };
        Err(err)
    }

    /// Process exit status for a failed command
    ///
    /// 2 for rejected actions and invalid tokens, 75 (`EX_TEMPFAIL`) when the
    /// same command may succeed if retried, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::Rejected | ErrorCategory::Token => 2,
            _ if self.is_recoverable() => 75,
            _ => 1,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
