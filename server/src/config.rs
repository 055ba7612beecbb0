//! Configuration management for the session ticket server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable numeric values fall back to the default.

use serde::{Deserialize, Serialize};
use session_tickets_core::AllocatorConfig;
use session_tickets_core::allocator::{DEFAULT_CODE_LENGTH, DEFAULT_KEY_PREFIX, DEFAULT_MAX_ATTEMPTS};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and metrics listeners
    pub server: ServerConfig,
    /// Redis connection
    pub redis: RedisConfig,
    /// Code allocation policy
    pub tickets: TicketConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Metrics server port (Prometheus scraping)
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Redis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Bound on each Redis round trip, in milliseconds
    pub op_timeout_ms: u64,
}

/// Ticket allocation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Namespace for ticket keys
    pub key_prefix: String,
    /// Symbols per code
    pub code_length: usize,
    /// Reserve attempts before giving up
    pub max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|raw| parse_trimmed(&raw))
        }

        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(8080),
                metrics_port: parsed(&lookup, "METRICS_PORT").unwrap_or(9090),
                shutdown_timeout: parsed(&lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
                op_timeout_ms: parsed(&lookup, "REDIS_OP_TIMEOUT_MS").unwrap_or(2000),
            },
            tickets: TicketConfig {
                key_prefix: lookup("TICKET_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
                code_length: parsed(&lookup, "TICKET_CODE_LENGTH").unwrap_or(DEFAULT_CODE_LENGTH),
                max_attempts: parsed(&lookup, "TICKET_MAX_ATTEMPTS").unwrap_or(DEFAULT_MAX_ATTEMPTS),
            },
        }
    }

    /// Address for the HTTP listener.
    #[must_use]
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Address for the metrics listener.
    #[must_use]
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.metrics_port)
    }

    /// Bound on each Redis round trip.
    #[must_use]
    pub const fn redis_op_timeout(&self) -> Duration {
        Duration::from_millis(self.redis.op_timeout_ms)
    }

    /// Time allowed for in-flight requests after a shutdown signal.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }

    /// Allocator policy. Validated when the allocator is built.
    #[must_use]
    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig::new()
            .with_key_prefix(self.tickets.key_prefix.clone())
            .with_code_length(self.tickets.code_length)
            .with_max_attempts(self.tickets.max_attempts)
    }
}

fn parse_trimmed<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.http_addr(), "0.0.0.0:8080");
        assert_eq!(config.metrics_addr(), "0.0.0.0:9090");
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.redis_op_timeout(), Duration::from_secs(2));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));

        let allocator = config.allocator_config();
        assert_eq!(allocator.code_length, 4);
        assert_eq!(allocator.max_attempts, 8);
        assert_eq!(allocator.key_prefix, "session");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("METRICS_PORT", "3001"),
            ("REDIS_URL", "redis://cache:6379/2"),
            ("REDIS_OP_TIMEOUT_MS", "250"),
            ("TICKET_KEY_PREFIX", "huddle"),
            ("TICKET_CODE_LENGTH", " 6 "),
            ("TICKET_MAX_ATTEMPTS", "12"),
            ("SHUTDOWN_TIMEOUT", "5"),
        ]);

        assert_eq!(config.http_addr(), "127.0.0.1:3000");
        assert_eq!(config.metrics_addr(), "127.0.0.1:3001");
        assert_eq!(config.redis.url, "redis://cache:6379/2");
        assert_eq!(config.redis_op_timeout(), Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));

        let allocator = config.allocator_config();
        assert_eq!(allocator.key_prefix, "huddle");
        assert_eq!(allocator.code_length, 6);
        assert_eq!(allocator.max_attempts, 12);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("TICKET_MAX_ATTEMPTS", "-1")]);

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tickets.max_attempts, 8);
    }

    #[test]
    fn test_zero_attempts_rejected_by_allocator_config() {
        let config = config_from(&[("TICKET_MAX_ATTEMPTS", "0")]);
        assert!(config.allocator_config().validate().is_err());
    }
}
