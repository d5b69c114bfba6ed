//! Shared application state and live-channel event types.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::model::{Notification, UserId};
use crate::service::StartupLink;

/// Frames pushed to a live channel.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    /// Sent once the channel is registered and will receive pushes.
    Ready {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    Notification(Notification),
    /// Sent before the server closes a channel it had to evict. The client
    /// should re-read `/api/notifications` and reconnect.
    EventsMissed {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

pub struct AppState {
    pub service: StartupLink,
    pub started_at: Instant,
}

impl AppState {
    pub fn shared(service: StartupLink) -> SharedState {
        Arc::new(Self {
            service,
            started_at: Instant::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;
