//! Startup update handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::model::{StartupId, UserId};
use crate::service::PostUpdate;
use crate::web::state::SharedState;
use crate::web::utils::bad_body;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdatesQuery {
    startup_id: Option<StartupId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostUpdateRequest {
    pub startup_id: StartupId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub update: PostUpdate,
}

/// GET /api/updates?startupId= - Newest first.
pub async fn list_updates_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListUpdatesQuery>,
) -> Response {
    let startup_id = params.startup_id.filter(|id| !id.is_empty());
    Json(state.service.list_updates(startup_id.as_ref())).into_response()
}

/// POST /api/updates - Post an update; followers are notified.
pub async fn post_update_handler(
    State(state): State<SharedState>,
    payload: Result<Json<PostUpdateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state
        .service
        .post_update(&req.startup_id, &req.user_id, req.update)
    {
        Ok(update) => (StatusCode::CREATED, Json(update)).into_response(),
        Err(e) => e.into_response(),
    }
}
