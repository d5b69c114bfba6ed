//! Startup feed handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::feed::FeedQuery;
use crate::model::StartupId;
use crate::service::CreateStartup;
use crate::web::state::SharedState;
use crate::web::utils::bad_body;

/// GET /api/startups?q=&category=&sort= - Filtered, sorted feed.
pub async fn list_startups_handler(
    State(state): State<SharedState>,
    Query(query): Query<FeedQuery>,
) -> Response {
    Json(state.service.list_startups(&query)).into_response()
}

/// GET /api/startups/:id
pub async fn get_startup_handler(
    State(state): State<SharedState>,
    Path(id): Path<StartupId>,
) -> Response {
    match state.service.get_startup(&id) {
        Ok(startup) => Json(startup).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/startups - Create a startup with zeroed counters.
pub async fn create_startup_handler(
    State(state): State<SharedState>,
    payload: Result<Json<CreateStartup>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state.service.create_startup(payload) {
        Ok(startup) => (StatusCode::CREATED, Json(startup)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/startups/:id/view - Count one view.
pub async fn view_startup_handler(
    State(state): State<SharedState>,
    Path(id): Path<StartupId>,
) -> Response {
    match state.service.view(&id) {
        Ok(views) => Json(serde_json::json!({ "ok": true, "views": views })).into_response(),
        Err(e) => e.into_response(),
    }
}
