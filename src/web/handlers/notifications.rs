//! Notification handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::model::{NotificationId, UserId};
use crate::web::state::SharedState;
use crate::web::utils::bad_body;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    user_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadAllRequest {
    pub user_id: UserId,
}

/// GET /api/notifications?userId= - Newest first.
pub async fn list_notifications_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListNotificationsQuery>,
) -> Response {
    let user_id = params.user_id.filter(|id| !id.is_empty());
    Json(state.service.list_notifications(user_id.as_ref())).into_response()
}

/// POST /api/notifications/:id/read - Mark a notification as read.
pub async fn mark_read_handler(
    State(state): State<SharedState>,
    Path(id): Path<NotificationId>,
) -> Response {
    match state.service.mark_notification_read(&id) {
        Ok(notification) => Json(notification).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/notifications/read-all - Mark every notification of a user as read.
pub async fn mark_all_read_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ReadAllRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state.service.mark_all_notifications_read(&req.user_id) {
        Ok(updated) => Json(serde_json::json!({ "ok": true, "updated": updated })).into_response(),
        Err(e) => e.into_response(),
    }
}
