//! Tracing setup and the metrics/health HTTP endpoint.

use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use zonesync_core::config::TelemetryConfig;

/// Initialize tracing. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("failed to set tracing subscriber")?;

    Ok(())
}

/// Serve the Prometheus text exposition and a health probe.
///
/// Runs until the process exits.
pub async fn serve_metrics(config: TelemetryConfig) -> Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .route(&config.metrics_path, get(metrics));

    let listener = tokio::net::TcpListener::bind(&config.metrics_listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.metrics_listen_addr))?;

    info!(
        addr = %config.metrics_listen_addr,
        path = %config.metrics_path,
        "starting prometheus exporter"
    );
    axum::serve(listener, app)
        .await
        .context("metrics server failed")?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], r#"{"healthy": true}"#)
}

async fn metrics() -> String {
    zonesync_core::metrics::render()
}
