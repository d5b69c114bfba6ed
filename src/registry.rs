//! Live connection registry.
//!
//! Maps a [`UserId`] to the set of channels currently open for that user
//! (one per connected device). Each channel is a bounded tokio `mpsc` queue;
//! the connection task owns the receiving [`ChannelHandle`] and forwards
//! whatever arrives to its socket.
//!
//! Delivery is best-effort. A user with no live channel simply misses the
//! push (the persisted notification remains readable over HTTP). A channel
//! whose receiver is gone is pruned the next time anything is sent to it.
//! A channel whose buffer is full has stopped draining; it loses the push
//! and is evicted the same way, so its reader sees the end of the stream
//! once the buffered pushes are consumed. Siblings are unaffected.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::EngagementError;
use crate::logging;
use crate::model::{Notification, UserId};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// Lifecycle of a channel: `Joining -> Live -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Joining,
    Live,
    Closed,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Pushes buffered per channel. A push that finds the buffer full evicts
    /// the channel.
    pub channel_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Outcome of one [`ConnectionRegistry::send_to_user`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Channels evicted because their buffer was full.
    pub dropped: usize,
    /// Channels found closed and removed.
    pub pruned: usize,
}

struct Inner {
    channels: DashMap<UserId, HashMap<ChannelId, mpsc::Sender<Notification>>>,
    next_channel: AtomicU64,
    live: AtomicUsize,
    config: RegistryConfig,
}

impl Inner {
    fn contains(&self, user_id: &UserId, channel: ChannelId) -> bool {
        self.channels
            .get(user_id)
            .is_some_and(|set| set.contains_key(&channel))
    }

    fn remove(&self, user_id: &UserId, channel: ChannelId) -> bool {
        let removed = match self.channels.get_mut(user_id) {
            Some(mut set) => set.remove(&channel).is_some(),
            None => false,
        };
        self.channels.remove_if(user_id, |_, set| set.is_empty());
        if removed {
            self.live.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }
}

/// Receiving end of one live channel. Dropping it deregisters the channel.
pub struct ChannelHandle {
    id: ChannelId,
    user_id: UserId,
    state: ChannelState,
    rx: mpsc::Receiver<Notification>,
    registry: Weak<Inner>,
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Wait for the next push. Returns `None` once the channel is closed,
    /// including when the registry evicted it.
    pub async fn recv(&mut self) -> Option<Notification> {
        if self.state == ChannelState::Closed {
            return None;
        }
        let next = self.rx.recv().await;
        if next.is_none() {
            self.state = ChannelState::Closed;
        }
        next
    }

    /// True once the registry removed this channel without a `leave`.
    pub fn is_evicted(&self) -> bool {
        self.state != ChannelState::Closed
            && self
                .registry
                .upgrade()
                .map_or(true, |inner| !inner.contains(&self.user_id, self.id))
    }

    /// Next buffered push, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        if self.state == ChannelState::Closed {
            return None;
        }
        self.rx.try_recv().ok()
    }

    fn close(&mut self) -> bool {
        if self.state == ChannelState::Closed {
            return false;
        }
        self.state = ChannelState::Closed;
        self.rx.close();
        match self.registry.upgrade() {
            Some(inner) => inner.remove(&self.user_id, self.id),
            None => false,
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<Inner>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ConnectionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: DashMap::new(),
                next_channel: AtomicU64::new(1),
                live: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// Open a new live channel for `user_id`. There is no per-user limit.
    pub fn join(&self, user_id: UserId) -> ChannelHandle {
        let id = ChannelId(self.inner.next_channel.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.config.channel_capacity.max(1));
        let mut handle = ChannelHandle {
            id,
            user_id: user_id.clone(),
            state: ChannelState::Joining,
            rx,
            registry: Arc::downgrade(&self.inner),
        };

        let pruned = {
            let mut set = self.inner.channels.entry(user_id).or_default();
            let before = set.len();
            set.retain(|_, tx| !tx.is_closed());
            let pruned = before - set.len();
            set.insert(id, tx);
            pruned
        };
        self.inner.live.fetch_add(1, Ordering::Relaxed);
        if pruned > 0 {
            self.inner.live.fetch_sub(pruned, Ordering::Relaxed);
        }

        handle.state = ChannelState::Live;
        debug!(
            user = %logging::user_id(handle.user_id.as_str()),
            channel = %id,
            pruned,
            "channel joined"
        );
        handle
    }

    /// Deregister a channel and mark it closed. Calling it again on the same
    /// handle does nothing.
    pub fn leave(&self, handle: &mut ChannelHandle) {
        if handle.state == ChannelState::Closed {
            return;
        }
        let removed = handle.close();
        debug!(
            user = %logging::user_id(handle.user_id.as_str()),
            channel = %handle.id,
            removed,
            "channel left"
        );
    }

    /// Push `message` to every live channel of `user_id`. Never blocks; a user
    /// with no channels gets nothing.
    pub fn send_to_user(&self, user_id: &UserId, message: &Notification) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let Some(mut set) = self.inner.channels.get_mut(user_id) else {
            return report;
        };

        set.retain(|channel, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                report.dropped += 1;
                let error = EngagementError::Delivery {
                    channel: *channel,
                    reason: "channel buffer full".to_string(),
                };
                warn!(
                    user = %logging::user_id(user_id.as_str()),
                    %error,
                    "push dropped; evicting channel"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                report.pruned += 1;
                let error = EngagementError::Delivery {
                    channel: *channel,
                    reason: "receiver closed".to_string(),
                };
                debug!(user = %logging::user_id(user_id.as_str()), %error, "pruning channel");
                false
            }
        });
        drop(set);

        let removed = report.pruned + report.dropped;
        if removed > 0 {
            self.inner.channels.remove_if(user_id, |_, set| set.is_empty());
            self.inner.live.fetch_sub(removed, Ordering::Relaxed);
        }
        report
    }

    /// Total live channels across all users.
    pub fn live_channels(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }

    pub fn channels_for(&self, user_id: &UserId) -> usize {
        self.inner
            .channels
            .get(user_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.channels_for(user_id) > 0
    }
}
