use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: usize,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let models_loaded = state.separation_service.registry().len();
    let (status, label) = if models_loaded == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            models_loaded,
        }),
    )
}
