//! Read and write operations exposed to the HTTP surface.
//!
//! Every write validates its input and resolves referenced records before
//! touching any state, commits its mutation, and only then hands a
//! [`DomainEvent`] to the dispatch queue. Whether the resulting notification
//! reaches anyone has no bearing on the write's result.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::dispatcher::{DispatchConfig, DispatchQueue, DomainEvent, NotificationDispatcher};
use crate::error::{EngagementError, Result};
use crate::feed::{FeedQuery, FeedService};
use crate::logging;
use crate::model::{
    now_millis, Comment, CommentId, Group, Like, LikeId, Links, Notification, NotificationId,
    Startup, StartupId, TeamMember, TeamMemberId, Update, UpdateId, User, UserId,
};
use crate::registry::ConnectionRegistry;
use crate::store::{generate_id, Counter, EntityStore};

const DEFAULT_BANNER: &str = "https://images.unsplash.com/photo-1518770660439-4636190af475";
const DEFAULT_WEBSITE: &str = "https://example.com";

/// Team member as submitted; the id is assigned on creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeamMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateStartup {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub media: Vec<String>,
    pub team: Vec<NewTeamMember>,
    pub links: Links,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub media: Vec<String>,
}

/// Blank input is rejected; accepted input is returned untouched.
fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EngagementError::validation(format!("`{field}` is required")))
}

/// The engagement service: store, feed, registry and dispatch queue wired
/// together. Cheap to clone.
#[derive(Clone)]
pub struct StartupLink {
    store: Arc<EntityStore>,
    feed: FeedService,
    registry: ConnectionRegistry,
    dispatch: DispatchQueue,
}

impl StartupLink {
    /// Build the service and spawn its dispatch worker on the current tokio
    /// runtime.
    pub fn new(
        store: Arc<EntityStore>,
        registry: ConnectionRegistry,
        config: DispatchConfig,
    ) -> (Self, JoinHandle<()>) {
        let dispatcher = NotificationDispatcher::new(Arc::clone(&store), registry.clone(), config);
        let (dispatch, worker) = DispatchQueue::spawn(dispatcher);
        let service = Self {
            feed: FeedService::new(Arc::clone(&store)),
            store,
            registry,
            dispatch,
        };
        (service, worker)
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Wait for every notification triggered so far to be persisted and
    /// pushed.
    pub async fn flush_notifications(&self) {
        self.dispatch.flush().await;
    }

    // -- Reads --

    pub fn list_startups(&self, query: &FeedQuery) -> Vec<Startup> {
        self.feed.list_startups(query)
    }

    pub fn get_startup(&self, id: &StartupId) -> Result<Startup> {
        self.feed.get_startup(id)
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.store.groups.list(|_| true)
    }

    pub fn list_users(&self) -> Vec<User> {
        self.store.users.list(|_| true)
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.store.users.get(id)
    }

    /// Newest first. `None` lists every user's notifications.
    pub fn list_notifications(&self, user_id: Option<&UserId>) -> Vec<Notification> {
        self.store.notifications.list_for(user_id)
    }

    /// Comments, newest first, optionally for one startup.
    pub fn list_comments(&self, startup_id: Option<&StartupId>) -> Vec<Comment> {
        let mut comments = self
            .store
            .comments
            .list(|c| startup_id.map_or(true, |id| &c.startup_id == id));
        comments.reverse();
        comments
    }

    /// Updates, newest first, optionally for one startup.
    pub fn list_updates(&self, startup_id: Option<&StartupId>) -> Vec<Update> {
        let mut updates = self
            .store
            .updates
            .list(|u| startup_id.map_or(true, |id| &u.startup_id == id));
        updates.reverse();
        updates
    }

    // -- Writes --

    pub fn create_startup(&self, payload: CreateStartup) -> Result<Startup> {
        let title = required(payload.title.as_deref(), "title")?;
        let description = required(payload.description.as_deref(), "description")?;
        let category = required(payload.category.as_deref(), "category")?;

        let owner = match payload.owner_id.filter(|id| !id.is_empty()) {
            Some(id) => self.store.users.get(&id)?,
            None => self
                .store
                .users
                .list(|_| true)
                .into_iter()
                .next()
                .ok_or_else(|| EngagementError::validation("`ownerId` is required"))?,
        };

        let mut startup = Startup::new(
            owner.id.clone(),
            title,
            description,
            category,
            now_millis(),
        );
        startup.banner = payload
            .media
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_BANNER.to_string());
        startup.website = payload
            .links
            .get("website")
            .cloned()
            .unwrap_or_else(|| DEFAULT_WEBSITE.to_string());
        startup.media = payload.media;
        startup.links = payload.links;
        startup.team = if payload.team.is_empty() {
            vec![TeamMember {
                id: TeamMemberId::from(generate_id()),
                name: "You".to_string(),
                role: "Founder".to_string(),
                photo: owner.avatar.clone(),
            }]
        } else {
            payload
                .team
                .into_iter()
                .map(|member| TeamMember {
                    id: TeamMemberId::from(generate_id()),
                    name: member.name,
                    role: member.role,
                    photo: member.photo,
                })
                .collect()
        };

        let startup = self.store.startups.insert_and_get(startup);
        info!(
            startup = %logging::startup_id(startup.id.as_str()),
            owner = %logging::user_id(startup.owner_id.as_str()),
            "startup created"
        );
        Ok(startup)
    }

    fn resolve_actor(&self, actor_id: &UserId) -> Result<()> {
        if actor_id.is_empty() {
            return Err(EngagementError::validation("`userId` is required"));
        }
        self.store.users.get(actor_id).map(|_| ())
    }

    fn resolve_startup(&self, startup_id: &StartupId) -> Result<()> {
        if startup_id.is_empty() {
            return Err(EngagementError::validation("`startupId` is required"));
        }
        self.store.startups.get(startup_id).map(|_| ())
    }

    /// Returns the new like count.
    pub fn like(&self, startup_id: &StartupId, actor_id: &UserId) -> Result<u64> {
        self.resolve_startup(startup_id)?;
        self.resolve_actor(actor_id)?;

        let likes = self.store.startups.increment(startup_id, Counter::Likes, 1)?;
        self.store.likes.insert(Like {
            id: LikeId::default(),
            startup_id: startup_id.clone(),
            user_id: actor_id.clone(),
            created_at: now_millis(),
        });
        self.dispatch.submit(DomainEvent::Liked {
            startup_id: startup_id.clone(),
            actor_id: actor_id.clone(),
        });
        Ok(likes)
    }

    /// Returns the new bookmark count. Bookmarks notify nobody.
    pub fn bookmark(&self, startup_id: &StartupId, actor_id: &UserId) -> Result<u64> {
        self.resolve_startup(startup_id)?;
        self.resolve_actor(actor_id)?;
        self.store
            .startups
            .increment(startup_id, Counter::Bookmarks, 1)
    }

    /// Returns the new view count.
    pub fn view(&self, startup_id: &StartupId) -> Result<u64> {
        self.store.startups.increment(startup_id, Counter::Views, 1)
    }

    pub fn comment(
        &self,
        startup_id: &StartupId,
        actor_id: &UserId,
        text: &str,
    ) -> Result<Comment> {
        let text = required(Some(text), "text")?;
        self.resolve_startup(startup_id)?;
        self.resolve_actor(actor_id)?;

        let comment = self.store.comments.insert_and_get(Comment {
            id: CommentId::default(),
            startup_id: startup_id.clone(),
            user_id: actor_id.clone(),
            text: text.to_string(),
            created_at: now_millis(),
        });
        self.dispatch.submit(DomainEvent::Commented {
            startup_id: startup_id.clone(),
            actor_id: actor_id.clone(),
            text: comment.text.clone(),
        });
        Ok(comment)
    }

    pub fn post_update(
        &self,
        startup_id: &StartupId,
        actor_id: &UserId,
        payload: PostUpdate,
    ) -> Result<Update> {
        let title = required(payload.title.as_deref(), "title")?;
        self.resolve_startup(startup_id)?;
        self.resolve_actor(actor_id)?;

        let update = self.store.updates.insert_and_get(Update {
            id: UpdateId::default(),
            startup_id: startup_id.clone(),
            user_id: actor_id.clone(),
            title: title.to_string(),
            body: payload.body.unwrap_or_default(),
            media: payload.media,
            created_at: now_millis(),
        });
        self.dispatch.submit(DomainEvent::UpdatePosted {
            startup_id: startup_id.clone(),
            update_id: update.id.clone(),
        });
        Ok(update)
    }

    pub fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification> {
        self.store.notifications.mark_read(id)
    }

    /// Returns how many notifications changed.
    pub fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<usize> {
        self.store.users.get(user_id)?;
        Ok(self.store.notifications.mark_all_read(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NotificationKind, Stats};
    use crate::registry::RegistryConfig;

    struct Fixture {
        app: StartupLink,
        owner: UserId,
        fan: UserId,
        startup: Startup,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(EntityStore::new());
        let owner = store.users.insert(User::new("Owner", "owner"));
        let fan = store.users.insert(User::new("Fan", "fan"));
        let (app, _worker) = StartupLink::new(
            store,
            ConnectionRegistry::new(RegistryConfig::default()),
            DispatchConfig::default(),
        );
        let startup = app
            .create_startup(CreateStartup {
                title: Some("Acme".to_string()),
                description: Some("Rockets for everyone".to_string()),
                category: Some("Tech".to_string()),
                owner_id: Some(owner.clone()),
                ..Default::default()
            })
            .unwrap();
        Fixture {
            app,
            owner,
            fan,
            startup,
        }
    }

    #[tokio::test]
    async fn test_create_startup_round_trip() {
        let f = fixture();
        let before = now_millis();
        let created = f
            .app
            .create_startup(CreateStartup {
                title: Some("X".to_string()),
                description: Some("Something new".to_string()),
                category: Some("Tech".to_string()),
                ..Default::default()
            })
            .unwrap();
        let after = now_millis();

        let fetched = f.app.get_startup(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.stats, Stats::default());
        assert!(fetched.created_at >= before && fetched.created_at <= after);
        // Owner defaults to the first user.
        assert_eq!(fetched.owner_id, f.owner);
        assert_eq!(fetched.team.len(), 1);
        assert_eq!(fetched.team[0].role, "Founder");
        assert_eq!(fetched.banner, DEFAULT_BANNER);
    }

    #[tokio::test]
    async fn test_create_startup_validates() {
        let f = fixture();
        let err = f
            .app
            .create_startup(CreateStartup {
                title: Some("  ".to_string()),
                description: Some("d".to_string()),
                category: Some("Tech".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, EngagementError::Validation(_)));

        let err = f
            .app
            .create_startup(CreateStartup {
                title: Some("t".to_string()),
                description: Some("d".to_string()),
                category: Some("Tech".to_string()),
                owner_id: Some(UserId::from("ghost")),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, EngagementError::NotFound { .. }));
        assert_eq!(f.app.list_startups(&FeedQuery::default()).len(), 1);
    }

    #[tokio::test]
    async fn test_like_increments_and_notifies_owner() {
        let f = fixture();
        let mut channel = f.app.registry().join(f.owner.clone());

        assert_eq!(f.app.like(&f.startup.id, &f.fan).unwrap(), 1);
        f.app.flush_notifications().await;

        let pushed = channel.try_recv().unwrap();
        assert_eq!(pushed.kind, NotificationKind::Like);
        assert_eq!(pushed.actor_id.as_ref(), Some(&f.fan));
        assert_eq!(channel.try_recv(), None);
        assert_eq!(f.app.list_notifications(Some(&f.owner)), vec![pushed]);
        assert_eq!(f.app.store().likes.len(), 1);
    }

    #[tokio::test]
    async fn test_like_on_missing_startup_changes_nothing() {
        let f = fixture();
        let err = f.app.like(&StartupId::from("missing"), &f.fan).unwrap_err();
        assert!(matches!(err, EngagementError::NotFound { .. }));
        f.app.flush_notifications().await;
        assert!(f.app.list_notifications(None).is_empty());
        assert!(f.app.store().likes.is_empty());
        assert_eq!(f.app.get_startup(&f.startup.id).unwrap().stats.likes, 0);
    }

    #[tokio::test]
    async fn test_like_from_unknown_actor_is_rejected() {
        let f = fixture();
        let err = f.app.like(&f.startup.id, &UserId::from("ghost")).unwrap_err();
        assert!(matches!(err, EngagementError::NotFound { .. }));
        let err = f.app.like(&f.startup.id, &UserId::default()).unwrap_err();
        assert!(matches!(err, EngagementError::Validation(_)));
        assert_eq!(f.app.get_startup(&f.startup.id).unwrap().stats.likes, 0);
    }

    #[tokio::test]
    async fn test_bookmark_does_not_notify() {
        let f = fixture();
        assert_eq!(f.app.bookmark(&f.startup.id, &f.fan).unwrap(), 1);
        assert_eq!(f.app.bookmark(&f.startup.id, &f.fan).unwrap(), 2);
        f.app.flush_notifications().await;
        assert!(f.app.list_notifications(None).is_empty());
    }

    #[tokio::test]
    async fn test_user_content_is_stored_as_given() {
        let f = fixture();
        let created = f
            .app
            .create_startup(CreateStartup {
                title: Some("  Acme  ".to_string()),
                description: Some("line one\nline two\n".to_string()),
                category: Some("Tech".to_string()),
                ..Default::default()
            })
            .unwrap();
        let fetched = f.app.get_startup(&created.id).unwrap();
        assert_eq!(fetched.title, "  Acme  ");
        assert_eq!(fetched.description, "line one\nline two\n");

        let comment = f.app.comment(&f.startup.id, &f.fan, "  indented\n").unwrap();
        assert_eq!(comment.text, "  indented\n");
        assert_eq!(f.app.list_comments(None)[0].text, "  indented\n");
        f.app.flush_notifications().await;
        let notifications = f.app.list_notifications(Some(&f.owner));
        assert_eq!(notifications[0].text.as_deref(), Some("  indented\n"));

        assert!(matches!(
            f.app.comment(&f.startup.id, &f.fan, " \n\t"),
            Err(EngagementError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_view_counts() {
        let f = fixture();
        for _ in 0..3 {
            f.app.view(&f.startup.id).unwrap();
        }
        assert_eq!(f.app.get_startup(&f.startup.id).unwrap().stats.views, 3);
    }

    #[tokio::test]
    async fn test_comment_is_listed_and_notifies() {
        let f = fixture();
        let comment = f.app.comment(&f.startup.id, &f.fan, "Love it").unwrap();
        assert!(matches!(
            f.app.comment(&f.startup.id, &f.fan, ""),
            Err(EngagementError::Validation(_))
        ));
        f.app.flush_notifications().await;

        assert_eq!(f.app.list_comments(Some(&f.startup.id)), vec![comment]);
        assert!(f.app.list_comments(Some(&StartupId::from("other"))).is_empty());
        let notifications = f.app.list_notifications(Some(&f.owner));
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].text.as_deref(), Some("Love it"));
    }

    #[tokio::test]
    async fn test_post_update_fans_out() {
        let f = fixture();
        let update = f
            .app
            .post_update(
                &f.startup.id,
                &f.owner,
                PostUpdate {
                    title: Some("Seed round closed".to_string()),
                    body: Some("We raised!".to_string()),
                    media: vec![],
                },
            )
            .unwrap();
        f.app.flush_notifications().await;

        assert_eq!(f.app.list_updates(None), vec![update.clone()]);
        for user in [&f.owner, &f.fan] {
            let notifications = f.app.list_notifications(Some(user));
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].update_id.as_ref(), Some(&update.id));
        }
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let f = fixture();
        f.app.like(&f.startup.id, &f.fan).unwrap();
        f.app.comment(&f.startup.id, &f.fan, "hi").unwrap();
        f.app.flush_notifications().await;

        assert_eq!(f.app.mark_all_notifications_read(&f.owner).unwrap(), 2);
        assert!(f
            .app
            .list_notifications(Some(&f.owner))
            .iter()
            .all(|n| n.read));
        assert!(matches!(
            f.app.mark_all_notifications_read(&UserId::from("ghost")),
            Err(EngagementError::NotFound { .. })
        ));
    }
}
