//! Live channel: WebSocket upgrade and push loop.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::logging;
use crate::model::UserId;
use crate::web::state::{SharedState, WsEvent};
use crate::web::utils::api_error;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQuery {
    user_id: Option<UserId>,
}

/// GET /ws/:user_id
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Response {
    upgrade(ws, state, user_id)
}

/// GET /ws?userId=
pub async fn ws_query_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(params): Query<ChannelQuery>,
) -> Response {
    match params.user_id.filter(|id| !id.is_empty()) {
        Some(user_id) => upgrade(ws, state, user_id),
        None => api_error(StatusCode::BAD_REQUEST, "`userId` is required"),
    }
}

fn upgrade(ws: WebSocketUpgrade, state: SharedState, user_id: UserId) -> Response {
    if let Err(e) = state.service.get_user(&user_id) {
        return e.into_response();
    }
    ws.on_upgrade(move |socket| ws_connection(socket, state, user_id))
        .into_response()
}

async fn send_event(socket: &mut WebSocket, event: &WsEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(WsMessage::Text(json)).await
}

async fn ws_connection(mut socket: WebSocket, state: SharedState, user_id: UserId) {
    let registry = state.service.registry().clone();
    let mut channel = registry.join(user_id.clone());
    info!(
        user = %logging::user_id(user_id.as_str()),
        channel = %channel.id(),
        "live channel opened"
    );

    let ready = WsEvent::Ready {
        user_id: user_id.clone(),
    };
    if send_event(&mut socket, &ready).await.is_ok() {
        loop {
            tokio::select! {
                pushed = channel.recv() => {
                    match pushed {
                        Some(notification) => {
                            let event = WsEvent::Notification(notification);
                            if send_event(&mut socket, &event).await.is_err() {
                                break; // client disconnected
                            }
                        }
                        None => {
                            let missed = WsEvent::EventsMissed {
                                user_id: user_id.clone(),
                            };
                            if let Err(error) = send_event(&mut socket, &missed).await {
                                debug!(channel = %channel.id(), %error, "events_missed not sent");
                            }
                            break;
                        }
                    }
                }
                // Clients have nothing to say on this channel. Pings are
                // answered by the protocol layer.
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => debug!(channel = %channel.id(), "ignoring client frame"),
                    }
                }
            }
        }
    }

    registry.leave(&mut channel);
    info!(
        user = %logging::user_id(user_id.as_str()),
        channel = %channel.id(),
        "live channel closed"
    );
}
