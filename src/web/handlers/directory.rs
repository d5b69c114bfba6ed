//! Group and user listings.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::web::state::SharedState;

/// GET /api/groups
pub async fn list_groups_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.service.list_groups())
}

/// GET /api/users
pub async fn list_users_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.service.list_users())
}
