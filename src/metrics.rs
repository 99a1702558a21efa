// src/metrics.rs
//! Prometheus wiring. Pipeline counters are emitted where the work
//! happens (`classify.rs`, `scorer.rs`); this module installs the
//! recorder and exposes `/metrics`.

use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ThresholdConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the active thresholds
    /// as static gauges (handy when comparing tuning runs).
    pub fn init(thresholds: &ThresholdConfig) -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder.install_recorder().expect("prometheus: install recorder");

        gauge!("triage_sentiment_threshold").set(thresholds.sentiment_threshold as f64);
        gauge!("triage_intent_threshold").set(thresholds.intent_threshold as f64);
        gauge!("triage_withdrawn_threshold").set(thresholds.withdrawn_threshold as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
