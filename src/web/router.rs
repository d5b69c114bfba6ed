//! Axum router construction.

use axum::routing::{get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::SharedState;

/// Build the complete Axum router with all API routes and the live channel.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        // Feed
        .route(
            "/api/startups",
            get(handlers::startups::list_startups_handler)
                .post(handlers::startups::create_startup_handler),
        )
        .route(
            "/api/startups/:startup_id",
            get(handlers::startups::get_startup_handler),
        )
        .route(
            "/api/startups/:startup_id/view",
            post(handlers::startups::view_startup_handler),
        )
        // Engagement
        .route("/api/likes", post(handlers::engagement::like_handler))
        .route(
            "/api/bookmarks",
            post(handlers::engagement::bookmark_handler),
        )
        .route(
            "/api/comments",
            get(handlers::comments::list_comments_handler)
                .post(handlers::comments::create_comment_handler),
        )
        .route(
            "/api/updates",
            get(handlers::updates::list_updates_handler)
                .post(handlers::updates::post_update_handler),
        )
        // Directory
        .route("/api/groups", get(handlers::directory::list_groups_handler))
        .route("/api/users", get(handlers::directory::list_users_handler))
        // Notifications
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications_handler),
        )
        .route(
            "/api/notifications/read-all",
            post(handlers::notifications::mark_all_read_handler),
        )
        .route(
            "/api/notifications/:notification_id/read",
            post(handlers::notifications::mark_read_handler),
        )
        // Live channel
        .route("/ws", get(handlers::websocket::ws_query_handler))
        .route("/ws/:user_id", get(handlers::websocket::ws_handler))
        .with_state(state)
}
