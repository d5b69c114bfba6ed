//! Like and bookmark handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::model::{StartupId, UserId};
use crate::web::state::SharedState;
use crate::web::utils::bad_body;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngagementRequest {
    pub startup_id: StartupId,
    pub user_id: UserId,
}

/// POST /api/likes - Like a startup; the owner is notified.
pub async fn like_handler(
    State(state): State<SharedState>,
    payload: Result<Json<EngagementRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state.service.like(&req.startup_id, &req.user_id) {
        Ok(likes) => Json(serde_json::json!({ "ok": true, "likes": likes })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/bookmarks - Bookmark a startup.
pub async fn bookmark_handler(
    State(state): State<SharedState>,
    payload: Result<Json<EngagementRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state.service.bookmark(&req.startup_id, &req.user_id) {
        Ok(bookmarks) => {
            Json(serde_json::json!({ "ok": true, "bookmarks": bookmarks })).into_response()
        }
        Err(e) => e.into_response(),
    }
}
