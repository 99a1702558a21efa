//! Feedback Triage Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, the classifier handle, and
//! the Prometheus endpoint.

use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedback_triage::api::{create_router, AppState};
use feedback_triage::classify::{start_hot_reload_thread, Classifier, ClassifierHandle};
use feedback_triage::config::ClassifyConfig;
use feedback_triage::metrics::Metrics;
use feedback_triage::zero_shot::{build_scorer_from_config, load_zero_shot_config};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feedback_triage=info,triage=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables
    // CLASSIFY_CONFIG_PATH / threshold overrides before config load.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Config errors are fatal here, never per-message.
    let config = ClassifyConfig::load()?;
    let metrics = Metrics::init(&config.thresholds);

    // Optional probabilistic scorer; absence means keyword-only operation.
    let zero_shot = build_scorer_from_config(&load_zero_shot_config());
    if zero_shot.is_none() {
        tracing::info!("zero-shot scorer disabled, running keyword-only");
    }

    let classifier = Classifier::new(config, zero_shot.clone())?;
    let handle = ClassifierHandle::new(classifier, zero_shot);

    // If a config file is in play and hot reload is enabled, watch it.
    if let Some(path) = ClassifyConfig::active_path() {
        start_hot_reload_thread(handle.clone(), path);
    }

    let batch_concurrency = std::env::var("BATCH_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4);

    let state = AppState { classifier: handle, batch_concurrency };
    let router = create_router(state).merge(metrics.router());

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;
    tracing::info!(%addr, "feedback-triage listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
