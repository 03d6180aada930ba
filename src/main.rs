//! Fraud Scoring Service - Main Entry Point
//!
//! Loads the fraud model once, then serves `POST /predict` and the history
//! and reporting routes over HTTP.

use anyhow::{Context, Result};
use fraud_scoring_service::{
    build_router,
    config::AppConfig,
    logging,
    metrics::{MetricsReporter, ScoringMetrics},
    AppState, ModelLoader, ScoringService, TransactionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging, "fraud_scoring_service")?;

    info!("Starting Fraud Scoring Service");

    // The model is loaded once and shared read-only by every request
    let scorer = ModelLoader::with_threads(config.model.onnx_threads).load(&config.model)?;

    let store = TransactionStore::open(
        &config.database.path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .with_context(|| format!("Failed to open transaction store {}", config.database.path))?;

    let metrics = Arc::new(ScoringMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let service = ScoringService::new(scorer, store, metrics.clone());
    let app = build_router(AppState::new(service));

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Listening for scoring requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Scoring service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
