use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::domain::StemTarget;
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct TargetInfo {
    pub target: StemTarget,
    pub sample_rate: u32,
    pub endpoint: String,
}

#[derive(Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetInfo>,
}

pub async fn targets_handler(State(state): State<AppState>) -> Json<TargetsResponse> {
    let registry = state.separation_service.registry();
    let targets = registry
        .targets()
        .into_iter()
        .filter_map(|target| {
            registry.get(target).map(|model| TargetInfo {
                target,
                sample_rate: model.sample_rate(),
                endpoint: format!("/separate/{}", target),
            })
        })
        .collect();

    Json(TargetsResponse { targets })
}
