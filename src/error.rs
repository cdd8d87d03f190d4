//! Error types for queues and hubs.

use std::fmt;
use thiserror::Error;

/// Why a suspended (or would-be suspended) operation was released early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interruption {
    /// The queue or hub was shut down.
    Shutdown,
    /// The caller's deadline elapsed before the operation could complete.
    Cancelled,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Shutdown => write!(f, "shut down"),
            Interruption::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Main error type for queue and hub operations.
///
/// A Dropping rejection is not an error: `offer`/`publish` report it as
/// `Ok(false)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CourierError {
    #[error("Operation interrupted: {0}")]
    Interrupted(Interruption),

    #[error("Invalid capacity: {0} (bounded capacity must be at least 1)")]
    InvalidCapacity(usize),
}

impl CourierError {
    /// Interrupted by shutdown.
    pub(crate) fn shutdown() -> Self {
        CourierError::Interrupted(Interruption::Shutdown)
    }

    /// Interrupted by an elapsed deadline.
    pub(crate) fn cancelled() -> Self {
        CourierError::Interrupted(Interruption::Cancelled)
    }

    /// True for either flavor of interruption.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, CourierError::Interrupted(_))
    }

    /// True if the interruption was caused by shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, CourierError::Interrupted(Interruption::Shutdown))
    }
}

/// Result type for queue and hub operations.
pub type Result<T> = std::result::Result<T, CourierError>;
