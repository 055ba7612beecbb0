//! Session ticket HTTP server.
//!
//! Issues short join codes for sessions and resolves them, with Redis as the
//! TTL store.
//!
//! # Endpoints
//!
//! - `POST /api/sessions` - allocate a ticket
//! - `GET /api/sessions/:code` - look up a live ticket
//! - `GET /health` - liveness
//! - `GET /ready` - readiness (pings Redis)
//! - `GET /metrics` - Prometheus metrics (on `METRICS_PORT`)
//!
//! # Configuration
//!
//! See [`config::Config`]. A `.env` file is loaded if present.

mod config;
mod metrics;

use crate::config::Config;
use crate::metrics::MetricsServer;
use anyhow::Context;
use session_tickets_core::TicketAllocator;
use session_tickets_redis::RedisTicketStore;
use session_tickets_web::{AppState, build_router};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_tickets=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session ticket server");

    let config = Config::from_env();
    info!(
        redis_url = %config.redis.url,
        key_prefix = %config.tickets.key_prefix,
        code_length = config.tickets.code_length,
        max_attempts = config.tickets.max_attempts,
        "Configuration loaded"
    );

    // Metrics
    let metrics = MetricsServer::install().context("failed to install metrics recorder")?;
    let metrics_listener = tokio::net::TcpListener::bind(config.metrics_addr())
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", config.metrics_addr()))?;
    info!(address = %config.metrics_addr(), "Metrics available at /metrics");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics.router()).await {
            error!(error = %e, "Metrics server stopped");
        }
    });

    // Store and allocator
    let store = RedisTicketStore::new(&config.redis.url, config.redis_op_timeout())
        .await
        .context("failed to connect to Redis")?;
    let allocator = TicketAllocator::new(store, config.allocator_config())
        .context("invalid ticket allocation settings")?;

    let app = build_router(AppState::new(allocator));

    // HTTP server
    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "HTTP server listening");

    let shutdown = Arc::new(Notify::new());
    let drain = Arc::clone(&shutdown);
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.notified().await })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => {
            joined.context("HTTP server task failed")??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    info!(
        timeout_secs = config.server.shutdown_timeout,
        "Shutting down, draining in-flight requests"
    );
    shutdown.notify_one();

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined.context("HTTP server task failed")??,
        Err(_) => warn!("Graceful shutdown timed out; exiting with requests in flight"),
    }

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
