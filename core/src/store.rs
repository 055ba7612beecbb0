//! Ticket store trait.
//!
//! This module defines the key-value contract the allocator depends on: a
//! single atomic "set if absent, with expiration" operation.

use crate::error::StoreError;
use crate::ticket::SessionTicket;

/// Result of an atomic reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The key was absent and now holds the ticket.
    Reserved,

    /// A live record already holds the key; it was left untouched.
    AlreadyExists,
}

/// Build the storage key for a code: `<prefix>:<code>`.
///
/// ```
/// use session_tickets_core::storage_key;
///
/// assert_eq!(storage_key("session", "QXFE"), "session:QXFE");
/// ```
#[must_use]
pub fn storage_key(prefix: &str, code: &str) -> String {
    format!("{prefix}:{code}")
}

/// TTL-capable key-value store holding session tickets.
///
/// # Implementation Notes
///
/// - **CRITICAL**: `reserve_if_absent()` MUST check and write in one atomic
///   step. Two concurrent callers observing "absent" and both writing would
///   hand out the same code twice.
/// - A collision must not modify the existing record (value or TTL).
/// - The store owns the record's lifetime and must remove it at or shortly
///   after `ttl_seconds` elapse.
/// - "Already exists" is a [`Reservation`], not a [`StoreError`]. Errors are
///   reserved for transport, auth, timeout, and encoding failures.
///
/// Suitable primitives:
/// - `Redis`: `SET key value NX EX ttl`
/// - In-memory: mutex-protected check-and-insert with a deadline
pub trait TicketStore: Send + Sync {
    /// Atomically store `ticket` under `key` if no live record holds it,
    /// expiring after `ttl_seconds`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store cannot be reached or the command fails
    /// - The round trip times out
    /// - The ticket cannot be serialized
    fn reserve_if_absent(
        &self,
        key: &str,
        ticket: &SessionTicket,
        ttl_seconds: u64,
    ) -> impl std::future::Future<Output = Result<Reservation, StoreError>> + Send;

    /// Fetch the live record under `key`, if any.
    ///
    /// Used only by the join path; the allocator never reads.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the record cannot be decoded.
    fn fetch(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<SessionTicket>, StoreError>> + Send;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
