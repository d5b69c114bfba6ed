//! Comment handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::model::{StartupId, UserId};
use crate::web::state::SharedState;
use crate::web::utils::bad_body;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    startup_id: Option<StartupId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCommentRequest {
    pub startup_id: StartupId,
    pub user_id: UserId,
    pub text: String,
}

/// GET /api/comments?startupId= - Newest first.
pub async fn list_comments_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListCommentsQuery>,
) -> Response {
    let startup_id = params.startup_id.filter(|id| !id.is_empty());
    Json(state.service.list_comments(startup_id.as_ref())).into_response()
}

/// POST /api/comments - Comment on a startup; the owner is notified.
pub async fn create_comment_handler(
    State(state): State<SharedState>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state
        .service
        .comment(&req.startup_id, &req.user_id, &req.text)
    {
        Ok(comment) => (StatusCode::CREATED, Json(comment)).into_response(),
        Err(e) => e.into_response(),
    }
}
