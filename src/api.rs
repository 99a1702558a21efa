// src/api.rs
//! HTTP surface. Thin glue: every route delegates straight into the
//! classifier; no business logic lives here.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::classify::ClassifierHandle;
use crate::message::{ClassificationResult, Message};
use crate::prefilter::Screen;
use crate::row::{ResultRow, StaffLookup};

#[derive(Clone)]
pub struct AppState {
    pub classifier: ClassifierHandle,
    /// Concurrency limit for batch fan-out (scorer rate limits live with
    /// the external collaborator; this only bounds in-flight calls).
    pub batch_concurrency: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/screen", post(screen))
        .route("/classify", post(classify))
        .route("/batch", post(batch))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn screen(State(state): State<AppState>, Json(msg): Json<Message>) -> Json<Screen> {
    let classifier = state.classifier.current();
    Json(classifier.screen(&msg))
}

#[derive(Serialize)]
struct ClassifyResp {
    #[serde(flatten)]
    result: ClassificationResult,
}

async fn classify(
    State(state): State<AppState>,
    Json(msg): Json<Message>,
) -> Json<ClassifyResp> {
    let classifier = state.classifier.current();
    let result = classifier.classify(&msg).await;
    Json(ClassifyResp { result })
}

#[derive(Serialize)]
struct BatchResp {
    received: usize,
    rows: Vec<ResultRow>,
}

async fn batch(
    State(state): State<AppState>,
    Json(messages): Json<Vec<Message>>,
) -> Json<BatchResp> {
    let received = messages.len();
    let classifier = state.classifier.current();
    let staff = classifier.staff_directory();
    let rows = classifier
        .process_batch(messages, state.batch_concurrency, Some(&staff as &dyn StaffLookup))
        .await;
    Json(BatchResp { received, rows })
}
