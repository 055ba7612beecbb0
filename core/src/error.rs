//! Error types for ticket allocation and lookup.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Errors surfaced by the allocator and resolver.
///
/// A collision on a single attempt is not represented here: it is retried
/// silently, and only exhaustion of every attempt becomes [`TicketError::Exhausted`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    // ═══════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════

    /// Bad input: missing, unparseable, or non-future expiry, or a malformed code.
    #[error("{0}")]
    Validation(String),

    /// No live ticket exists for the requested code.
    #[error("session not found")]
    NotFound,

    // ═══════════════════════════════════════════════════════════
    // Transient Errors
    // ═══════════════════════════════════════════════════════════

    /// Every attempt collided with a live ticket.
    #[error("could not allocate code, try again")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// The store's primitive could not be reached or executed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    // ═══════════════════════════════════════════════════════════
    // Fatal Errors
    // ═══════════════════════════════════════════════════════════

    /// The operating system's secure random source failed.
    #[error("secure random source unavailable: {0}")]
    Entropy(String),

    /// Allocator or alphabet configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TicketError {
    /// Returns `true` if this error is due to invalid caller input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use session_tickets_core::TicketError;
    /// assert!(TicketError::Validation("bad".into()).is_user_error());
    /// assert!(!TicketError::Exhausted { attempts: 8 }.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound)
    }

    /// Returns `true` if the caller should back off and retry the whole call.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::StoreUnavailable(_))
    }
}

/// Failures of the key-value store adapter.
///
/// Every variant is an infrastructure failure. "Key already exists" is a
/// normal [`Reservation`](crate::store::Reservation) outcome, never a `StoreError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not connect or authenticate.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The command was rejected or failed mid-flight.
    #[error("command failed: {0}")]
    Command(String),

    /// The round trip did not complete within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A ticket could not be encoded or a stored record could not be decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
