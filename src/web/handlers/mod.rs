//! Route handler modules for the startuplink REST API.

pub mod comments;
pub mod directory;
pub mod engagement;
pub mod health;
pub mod notifications;
pub mod startups;
pub mod updates;
pub mod websocket;
