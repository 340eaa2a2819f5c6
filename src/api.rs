//! Plain HTTP endpoints

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

pub const LIVENESS_TEXT: &str = "Super Flawed backend active";

/// Liveness probe
pub async fn health() -> &'static str {
    LIVENESS_TEXT
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub rooms: usize,
    pub prompts: usize,
    pub responses: usize,
}

/// GET /status: room count and deck size
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        rooms: state.rooms.len().await,
        prompts: state.catalog.prompts.len(),
        responses: state.catalog.responses.len(),
    })
}
