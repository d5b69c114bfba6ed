//! Error taxonomy shared by the store, dispatcher and HTTP surface.

use thiserror::Error;

use crate::model::EntityKind;
use crate::registry::ChannelId;

#[derive(Debug, Error)]
pub enum EngagementError {
    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Malformed or missing input. Raised before any state changes.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} has no counter named `{field}`")]
    InvalidField { kind: EntityKind, field: String },

    /// A live channel could not take a push. Recovered inside the registry
    /// and never returned to the caller of the triggering action.
    #[error("delivery to channel {channel} failed: {reason}")]
    Delivery { channel: ChannelId, reason: String },

    /// An optimistic counter update observed a stale value.
    #[error("{kind} {id} was modified concurrently")]
    ConcurrencyConflict { kind: EntityKind, id: String },
}

impl EngagementError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        EngagementError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngagementError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngagementError>;
