use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    scene_count: usize,
    skipped_sources: usize,
}

impl HealthState {
    pub fn new(scene_count: usize, skipped_sources: usize) -> Self {
        Self { scene_count, skipped_sources }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub scenes: HealthCheck,
    pub scene_count: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let scenes = scene_check(&state);
    let ready = scenes.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "slotpilot-server runtime initialized".to_string(),
        },
        scenes,
        scene_count: state.scene_count,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn scene_check(state: &HealthState) -> HealthCheck {
    match (state.scene_count, state.skipped_sources) {
        (0, _) => HealthCheck { status: "degraded", detail: "no scenes loaded".to_string() },
        (count, 0) => HealthCheck { status: "ready", detail: format!("{count} scenes loaded") },
        (count, skipped) => HealthCheck {
            status: "ready",
            detail: format!("{count} scenes loaded, {skipped} sources skipped"),
        },
    }
}
