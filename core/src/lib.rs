//! # Session Tickets Core
//!
//! Short, human-typeable session codes reserved atomically against a shared
//! key-value store with a time-to-live.
//!
//! A host creates a session, the allocator hands back a code like `QXFE`,
//! and guests type that code to join until the ticket expires.
//!
//! ## Components
//!
//! - **Code generator** ([`generator`]): fixed-length codes drawn uniformly
//!   from an [`Alphabet`] using the operating system's secure random source
//! - **Ticket allocator** ([`allocator`]): bounded retry loop of
//!   `generate -> reserve if absent`, where a collision is control flow and
//!   only total exhaustion is an error
//! - **Ticket store** ([`store`]): the atomic "set if absent, with
//!   expiration" primitive, implemented by backends such as Redis
//! - **Ticket resolver** ([`resolver`]): looks up a live ticket by the code a
//!   guest typed
//!
//! ## Flow
//!
//! ```text
//! expires_at, payload
//!        │
//!        ▼
//!  validate + ttl ──(not in future)──▶ Validation
//!        │
//!        ▼
//!  ┌─▶ generate code ──▶ reserve_if_absent(<prefix>:<CODE>, ticket, ttl)
//!  │                          │            │               │
//!  │                     Reserved    AlreadyExists     StoreError
//!  │                          │            │               │
//!  │                       ticket ◀────────┘ (collision)   ▼
//!  └──────────────────────────────────────────────── StoreUnavailable
//!        after max_attempts collisions ──▶ Exhausted
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use session_tickets_core::{AllocatorConfig, TicketAllocator};
//! use chrono::{Duration, Utc};
//!
//! let allocator = TicketAllocator::new(store, AllocatorConfig::default())?;
//! let ticket = allocator
//!     .allocate(Utc::now() + Duration::hours(1), Some(serde_json::json!({"price": 2})))
//!     .await?;
//! println!("join with {}", ticket.code);
//! ```

pub mod allocator;
pub mod environment;
pub mod error;
pub mod generator;
pub mod resolver;
pub mod store;
pub mod ticket;

// Re-export commonly used types
pub use allocator::{AllocatorConfig, AttemptOutcome, CollisionBackoff, TicketAllocator, parse_expiry};
pub use environment::{Clock, SystemClock};
pub use error::{Result, StoreError, TicketError};
pub use generator::{CodeGenerator, SecureCodeGenerator};
pub use resolver::TicketResolver;
pub use store::{Reservation, TicketStore, storage_key};
pub use ticket::{Alphabet, SessionCode, SessionTicket};
