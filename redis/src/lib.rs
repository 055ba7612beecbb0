//! Redis-based ticket store implementation.
//!
//! Tickets are stored in Redis with:
//! - **Key**: `<prefix>:<CODE>` (built by the allocator) → JSON-serialized `SessionTicket`
//! - **TTL**: whole seconds until the ticket's `expires_at`, set in the same command
//! - **Atomic reserve**: `SET key value NX EX ttl`
//!
//! # Atomicity
//!
//! `SET ... NX` checks for the key and writes it as one indivisible step on
//! the server. A `nil` reply means a live ticket already holds the key and
//! was left untouched (value and TTL); `OK` means this caller owns the code.
//! Expiry is enforced by Redis itself, so no application code ever deletes a
//! ticket.
//!
//! # Timeouts
//!
//! Every round trip is bounded by `op_timeout`. An elapsed timeout is reported
//! as [`StoreError::Timeout`], never as a collision, and is not retried here.
//!
//! # Example
//!
//! ```no_run
//! use session_tickets_core::{AllocatorConfig, TicketAllocator};
//! use session_tickets_redis::RedisTicketStore;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisTicketStore::new("redis://127.0.0.1:6379", Duration::from_secs(2)).await?;
//! let allocator = TicketAllocator::new(store, AllocatorConfig::default())?;
//!
//! let ticket = allocator
//!     .allocate(chrono::Utc::now() + chrono::Duration::hours(2), None)
//!     .await?;
//! println!("join with {}", ticket.code);
//! # Ok(())
//! # }
//! ```

use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError, RedisResult};
use session_tickets_core::{Reservation, SessionTicket, StoreError, TicketStore};
use std::future::Future;
use std::time::Duration;

/// Default bound on a single Redis round trip.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// `Redis`-backed ticket store.
///
/// # Thread Safety
///
/// This type is `Clone` and can be safely shared across threads.
/// Each clone shares the same `ConnectionManager` (multiplexed connection).
#[derive(Clone)]
pub struct RedisTicketStore {
    /// Connection manager with automatic reconnection.
    conn_manager: ConnectionManager,

    /// Bound on each round trip.
    op_timeout: Duration,
}

impl RedisTicketStore {
    /// Connect to `Redis`.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    /// * `op_timeout` - bound on every subsequent round trip
    ///
    /// # Connection URL Format
    ///
    /// - TCP: `redis://[:password@]host[:port][/database]`
    /// - Unix socket: `redis+unix:///path/to/redis.sock[?db=database[&pass=password]]`
    /// - TLS: `rediss://[:password@]host[:port][/database]`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if:
    /// - `Redis` URL is malformed
    /// - Connection to `Redis` server fails
    /// - Authentication fails
    pub async fn new(redis_url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            StoreError::Connection(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!(
            op_timeout_ms = op_timeout.as_millis(),
            "RedisTicketStore initialized successfully"
        );

        Ok(Self {
            conn_manager,
            op_timeout,
        })
    }

    /// Bound on each round trip.
    #[must_use]
    pub const fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Run one round trip under the configured timeout.
    async fn bounded<T>(&self, op: impl Future<Output = RedisResult<T>>) -> Result<T, StoreError> {
        bounded(self.op_timeout, op).await
    }
}

/// Run `op`, failing with [`StoreError::Timeout`] once `op_timeout` elapses.
async fn bounded<T>(
    op_timeout: Duration,
    op: impl Future<Output = RedisResult<T>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(op_timeout, op).await {
        Ok(result) => result.map_err(|err| map_redis_error(err, op_timeout)),
        Err(_) => Err(StoreError::Timeout(op_timeout)),
    }
}

/// Classify a `Redis` failure. Client-side timeouts report `op_timeout`.
fn map_redis_error(err: RedisError, op_timeout: Duration) -> StoreError {
    let unreachable = err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.kind() == ErrorKind::AuthenticationFailed;

    if err.is_timeout() {
        StoreError::Timeout(op_timeout)
    } else if unreachable {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

impl TicketStore for RedisTicketStore {
    async fn reserve_if_absent(
        &self,
        key: &str,
        ticket: &SessionTicket,
        ttl_seconds: u64,
    ) -> Result<Reservation, StoreError> {
        let mut conn = self.conn_manager.clone();
        let value = serde_json::to_string(ticket)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_seconds);

        // OK when written, nil when the key already exists
        let reply: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;

        if reply.is_some() {
            tracing::debug!(key, ttl_seconds, "Reserved ticket key in Redis");
            Ok(Reservation::Reserved)
        } else {
            tracing::trace!(key, "Ticket key already live in Redis");
            Ok(Reservation::AlreadyExists)
        }
    }

    async fn fetch(&self, key: &str) -> Result<Option<SessionTicket>, StoreError> {
        let mut conn = self.conn_manager.clone();

        let mut cmd = redis::cmd("GET");
        cmd.arg(key);

        let raw: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;

        raw.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn_manager.clone();
        let cmd = redis::cmd("PING");

        let _: String = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP_TIMEOUT: Duration = Duration::from_millis(250);

    #[test]
    fn test_timeouts_are_timeout_failures() {
        let err = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "read timed out",
        ));
        assert_eq!(map_redis_error(err, OP_TIMEOUT), StoreError::Timeout(OP_TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_round_trip_times_out() {
        let stalled = std::future::pending::<RedisResult<String>>();

        let result = bounded(OP_TIMEOUT, stalled).await;

        assert_eq!(result, Err(StoreError::Timeout(OP_TIMEOUT)));
    }

    #[tokio::test]
    async fn test_round_trip_error_is_classified() {
        let failed = async { Err::<String, _>(RedisError::from((ErrorKind::ResponseError, "ERR"))) };

        let result = bounded(OP_TIMEOUT, failed).await;

        assert!(matches!(result, Err(StoreError::Command(_))));
    }

    #[test]
    fn test_io_errors_are_connection_failures() {
        let err = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert!(matches!(map_redis_error(err, OP_TIMEOUT), StoreError::Connection(_)));
    }

    #[test]
    fn test_auth_failures_are_connection_failures() {
        let err = RedisError::from((ErrorKind::AuthenticationFailed, "WRONGPASS"));
        assert!(matches!(map_redis_error(err, OP_TIMEOUT), StoreError::Connection(_)));
    }

    #[test]
    fn test_server_errors_are_command_failures() {
        let err = RedisError::from((ErrorKind::ResponseError, "ERR syntax error"));
        assert!(matches!(map_redis_error(err, OP_TIMEOUT), StoreError::Command(_)));
    }
}
