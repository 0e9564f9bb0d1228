//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: String,
    pub version: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.config().engine;

    Json(HealthResponse {
        status: "ok",
        engine: engine.name.clone(),
        version: engine.version.clone(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
