//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::web::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "ok": true,
        "channels": state.service.registry().live_channels(),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    });
    (StatusCode::OK, axum::Json(body))
}
