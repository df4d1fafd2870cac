use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine();
    tracing::trace!(engine_state = %engine.state(), "Health probe");

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            model_loaded: engine.is_ready(),
        }),
    )
}
