//! Prometheus metrics exporter.
//!
//! Installs the global `metrics` recorder and serves `GET /metrics` on its
//! own listener, separate from the public API.

use axum::{Router, extract::State, routing::get};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
pub struct MetricsServer {
    handle: PrometheusHandle,
}

impl MetricsServer {
    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a recorder is already installed.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("tickets.allocation_attempts".to_string()),
                &[1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        Ok(Self { handle })
    }

    /// Router serving `GET /metrics`.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render_metrics))
            .with_state(self.handle.clone())
    }
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("tickets.allocated", "Session tickets successfully allocated");
    describe_counter!(
        "tickets.collisions",
        "Reserve attempts that hit a code already held by a live ticket"
    );
    describe_counter!(
        "tickets.exhausted",
        "Allocations that gave up after every attempt collided"
    );
    describe_counter!(
        "tickets.store_errors",
        "Allocations aborted by a store failure"
    );
    describe_histogram!(
        "tickets.allocation_attempts",
        "Attempts needed per successful allocation"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_renders_ticket_metrics() {
        let server = MetricsServer::install().unwrap();

        metrics::counter!("tickets.allocated").increment(3);
        metrics::histogram!("tickets.allocation_attempts").record(2.0);

        let rendered = server.handle.render();
        assert!(rendered.contains("tickets_allocated 3"));
        assert!(rendered.contains("tickets_allocation_attempts"));
    }
}
