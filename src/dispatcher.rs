//! Notification fan-out.
//!
//! Write operations commit their mutation first and then hand a
//! [`DomainEvent`] to the [`DispatchQueue`]. A single worker task owns the
//! [`NotificationDispatcher`], which resolves recipients, appends one
//! [`Notification`] per recipient to the store and pushes it through the
//! [`ConnectionRegistry`]. Failures in that second step are logged and never
//! reach the caller of the original write.
//!
//! Recipients for an update are a fixed sample of the user list (the first
//! [`DispatchConfig::update_fanout`] users), not the startup's real
//! followers. Follower-graph fan-out is not modelled.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{EngagementError, Result};
use crate::logging;
use crate::model::{
    EntityKind, Notification, NotificationId, NotificationKind, Startup, StartupId, UpdateId,
    UserId,
};
use crate::registry::ConnectionRegistry;
use crate::store::EntityStore;

pub const DEFAULT_UPDATE_FANOUT: usize = 6;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How many users an update notification is sent to.
    pub update_fanout: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            update_fanout: DEFAULT_UPDATE_FANOUT,
        }
    }
}

/// A committed engagement action that may notify someone.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Liked {
        startup_id: StartupId,
        actor_id: UserId,
    },
    Commented {
        startup_id: StartupId,
        actor_id: UserId,
        text: String,
    },
    UpdatePosted {
        startup_id: StartupId,
        update_id: UpdateId,
    },
}

impl DomainEvent {
    pub fn startup_id(&self) -> &StartupId {
        match self {
            DomainEvent::Liked { startup_id, .. }
            | DomainEvent::Commented { startup_id, .. }
            | DomainEvent::UpdatePosted { startup_id, .. } => startup_id,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            DomainEvent::Liked { .. } => NotificationKind::Like,
            DomainEvent::Commented { .. } => NotificationKind::Comment,
            DomainEvent::UpdatePosted { .. } => NotificationKind::Update,
        }
    }

    fn notification_for(&self, recipient: UserId) -> Notification {
        let mut notification = Notification {
            id: NotificationId::default(),
            user_id: recipient,
            kind: self.kind(),
            startup_id: self.startup_id().clone(),
            actor_id: None,
            update_id: None,
            text: None,
            created_at: 0,
            read: false,
        };
        match self {
            DomainEvent::Liked { actor_id, .. } => {
                notification.actor_id = Some(actor_id.clone());
            }
            DomainEvent::Commented { actor_id, text, .. } => {
                notification.actor_id = Some(actor_id.clone());
                notification.text = Some(text.clone());
            }
            DomainEvent::UpdatePosted { update_id, .. } => {
                notification.update_id = Some(update_id.clone());
            }
        }
        notification
    }
}

pub struct NotificationDispatcher {
    store: Arc<EntityStore>,
    registry: ConnectionRegistry,
    config: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<EntityStore>,
        registry: ConnectionRegistry,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn like(&self, startup_id: StartupId, actor_id: UserId) -> Result<Vec<Notification>> {
        self.dispatch(&DomainEvent::Liked {
            startup_id,
            actor_id,
        })
    }

    pub fn comment(
        &self,
        startup_id: StartupId,
        actor_id: UserId,
        text: String,
    ) -> Result<Vec<Notification>> {
        self.dispatch(&DomainEvent::Commented {
            startup_id,
            actor_id,
            text,
        })
    }

    pub fn post_update(
        &self,
        startup_id: StartupId,
        update_id: UpdateId,
    ) -> Result<Vec<Notification>> {
        self.dispatch(&DomainEvent::UpdatePosted {
            startup_id,
            update_id,
        })
    }

    /// Persist and push the notifications for one event.
    ///
    /// Fails with `NotFound` only when the startup is missing, in which case
    /// nothing is written. Recipients that are not known users are skipped.
    pub fn dispatch(&self, event: &DomainEvent) -> Result<Vec<Notification>> {
        let startup = self.store.startups.get(event.startup_id())?;
        let recipients = self.resolve_recipients(&startup, event);

        let mut created = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if !self.store.users.contains(&recipient) {
                let error = EngagementError::not_found(EntityKind::User, &recipient);
                warn!(
                    startup = %logging::startup_id(startup.id.as_str()),
                    %error,
                    "skipping notification recipient"
                );
                continue;
            }
            let notification = self.store.notifications.append(event.notification_for(recipient));
            let report = self
                .registry
                .send_to_user(&notification.user_id, &notification);
            debug!(
                notification = %notification.id,
                user = %logging::user_id(notification.user_id.as_str()),
                kind = ?notification.kind,
                delivered = report.delivered,
                dropped = report.dropped,
                pruned = report.pruned,
                "notification dispatched"
            );
            created.push(notification);
        }
        Ok(created)
    }

    fn resolve_recipients(&self, startup: &Startup, event: &DomainEvent) -> Vec<UserId> {
        match event {
            DomainEvent::Liked { .. } | DomainEvent::Commented { .. } => {
                vec![startup.owner_id.clone()]
            }
            DomainEvent::UpdatePosted { .. } => self
                .store
                .users
                .list(|_| true)
                .into_iter()
                .take(self.config.update_fanout)
                .map(|user| user.id)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Background worker
// ---------------------------------------------------------------------------

enum Job {
    Event(DomainEvent),
    Flush(oneshot::Sender<()>),
}

/// Sending side of the dispatch worker. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl DispatchQueue {
    /// Spawn the worker on the current tokio runtime. The worker exits once
    /// every queue handle is dropped.
    pub fn spawn(dispatcher: NotificationDispatcher) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(dispatcher, rx));
        (Self { tx }, worker)
    }

    /// Hand off an event. Never blocks and never fails the caller.
    pub fn submit(&self, event: DomainEvent) {
        if let Err(mpsc::error::SendError(Job::Event(event))) = self.tx.send(Job::Event(event)) {
            warn!(
                startup = %event.startup_id(),
                kind = ?event.kind(),
                "dispatch worker stopped; event dropped"
            );
        }
    }

    /// Wait until every event submitted before this call has been handled.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run_worker(dispatcher: NotificationDispatcher, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Event(event) => {
                if let Err(error) = dispatcher.dispatch(&event) {
                    warn!(startup = %event.startup_id(), %error, "notification dispatch failed");
                }
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("dispatch worker stopped");
}
