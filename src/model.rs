//! Domain records held by the entity store.
//!
//! Every record serializes with camelCase field names and millisecond
//! timestamps, which is the shape the HTTP and live-channel surfaces emit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

define_id!(
    /// Addressing key for users and for the connection registry.
    UserId
);
define_id!(StartupId);
define_id!(GroupId);
define_id!(ThreadId);
define_id!(ReplyId);
define_id!(UpdateId);
define_id!(CommentId);
define_id!(LikeId);
define_id!(NotificationId);
define_id!(TeamMemberId);

/// The record collections owned by the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Startup,
    User,
    Group,
    Update,
    Comment,
    Like,
    Notification,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Startup => "startup",
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Update => "update",
            EntityKind::Comment => "comment",
            EntityKind::Like => "like",
            EntityKind::Notification => "notification",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Engagement counters. Adjusted only through the store's increment path and
/// never allowed below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub views: u64,
    pub likes: u64,
    pub bookmarks: u64,
    pub followers: u64,
}

/// Free-form link map (`website`, `twitter`, `linkedin`, ...).
pub type Links = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub name: String,
    pub role: String,
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Startup {
    pub id: StartupId,
    pub owner_id: UserId,
    pub title: String,
    pub logo: String,
    pub banner: String,
    pub description: String,
    pub category: String,
    pub media: Vec<String>,
    pub website: String,
    pub links: Links,
    pub team: Vec<TeamMember>,
    pub stats: Stats,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: ReplyId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub author_id: UserId,
    pub body: String,
    pub created_at: u64,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub followers: u64,
    pub threads: Vec<Thread>,
}

/// A milestone post on a startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: UpdateId,
    pub startup_id: StartupId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub media: Vec<String>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub startup_id: StartupId,
    pub user_id: UserId,
    pub text: String,
    pub created_at: u64,
}

/// Ledger entry for an accepted like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: LikeId,
    pub startup_id: StartupId,
    pub user_id: UserId,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient. Never changes after creation.
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub startup_id: StartupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<UpdateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub created_at: u64,
    pub read: bool,
}

impl Startup {
    /// A startup with zeroed counters and no id yet; the store assigns one on
    /// insert.
    pub fn new(
        owner_id: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        created_at: u64,
    ) -> Self {
        let title = title.into();
        let logo_seed: String = title.chars().take(8).collect();
        Self {
            id: StartupId::default(),
            owner_id,
            logo: format!("https://api.dicebear.com/7.x/shapes/svg?seed={logo_seed}"),
            title,
            banner: String::new(),
            description: description.into(),
            category: category.into(),
            media: Vec::new(),
            website: String::new(),
            links: Links::new(),
            team: Vec::new(),
            stats: Stats::default(),
            created_at,
        }
    }
}

impl User {
    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: UserId::default(),
            name: name.into(),
            username: username.into(),
            avatar: String::new(),
            bio: String::new(),
            followers: 0,
            following: 0,
        }
    }
}

/// Current time as milliseconds since UNIX epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
