//! # Session Tickets Testing
//!
//! Testing utilities for session ticket allocation.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic time
//! - [`MockTicketStore`]: in-memory TTL store with an atomic reserve and a reaper
//! - [`ScriptedTicketStore`]: replies from a script and records every call
//! - [`CountingCodeGenerator`], [`SequenceCodeGenerator`], [`FailingCodeGenerator`]
//!
//! ## Example
//!
//! ```
//! use session_tickets_core::{AllocatorConfig, Reservation, TicketAllocator, TicketError};
//! use session_tickets_testing::{CountingCodeGenerator, ScriptedTicketStore};
//! use chrono::{Duration, Utc};
//!
//! # tokio_test::block_on(async {
//! let store = ScriptedTicketStore::always(Ok(Reservation::AlreadyExists));
//! let generator = CountingCodeGenerator::new();
//! let allocator = TicketAllocator::new(store.clone(), AllocatorConfig::default())
//!     .unwrap()
//!     .with_generator(generator.clone());
//!
//! let result = allocator.allocate(Utc::now() + Duration::hours(1), None).await;
//! assert!(matches!(result, Err(TicketError::Exhausted { attempts: 8 })));
//! assert_eq!(generator.calls(), 8);
//! assert_eq!(store.call_count(), 8);
//! # });
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned test mutexes

use chrono::{DateTime, Utc};
use session_tickets_core::environment::Clock;

pub mod generators;
pub mod mock_store;
pub mod scripted_store;

/// Mock implementations of injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use session_tickets_testing::mocks::FixedClock;
    /// use session_tickets_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use generators::{CountingCodeGenerator, FailingCodeGenerator, SequenceCodeGenerator};
pub use mock_store::MockTicketStore;
pub use mocks::{FixedClock, test_clock};
pub use scripted_store::{RecordedReserve, ScriptedTicketStore};
