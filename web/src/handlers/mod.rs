//! HTTP request handlers.

pub mod health;
pub mod sessions;

pub use health::{health_check, readiness_check};
pub use sessions::{create_session, get_session};
