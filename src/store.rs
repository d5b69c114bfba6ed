//! In-memory entity store.
//!
//! Owns the canonical records for every entity kind. Each kind lives in a
//! [`Table`]: a concurrent map from id to a record guarded by its own
//! `RwLock`, so counter increments on one startup never wait behind another
//! startup's lock. The map's shard locks are only held long enough to clone
//! the record handle.
//!
//! Notifications go through [`NotificationLog`], which serializes appends so
//! that `createdAt` never decreases in insertion order.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;

use crate::error::{EngagementError, Result};
use crate::model::{
    now_millis, Comment, CommentId, EntityKind, Group, GroupId, Like, LikeId, Notification,
    NotificationId, Startup, StartupId, Update, UpdateId, User, UserId,
};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 10;

/// Random opaque id: 10 characters from `[0-9a-z]`.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Named engagement counters. Which ones a record carries depends on its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Views,
    Likes,
    Bookmarks,
    Followers,
    Following,
}

impl Counter {
    pub fn as_str(self) -> &'static str {
        match self {
            Counter::Views => "views",
            Counter::Likes => "likes",
            Counter::Bookmarks => "bookmarks",
            Counter::Followers => "followers",
            Counter::Following => "following",
        }
    }

    pub fn parse(kind: EntityKind, field: &str) -> Result<Self> {
        match field {
            "views" => Ok(Counter::Views),
            "likes" => Ok(Counter::Likes),
            "bookmarks" => Ok(Counter::Bookmarks),
            "followers" => Ok(Counter::Followers),
            "following" => Ok(Counter::Following),
            other => Err(EngagementError::InvalidField {
                kind,
                field: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn apply_delta(current: u64, delta: i64, field: Counter) -> Result<u64> {
    let next = if delta >= 0 {
        current.checked_add(delta as u64)
    } else {
        current.checked_sub(delta.unsigned_abs())
    };
    next.ok_or_else(|| {
        EngagementError::validation(format!(
            "counter `{field}` cannot move from {current} by {delta}"
        ))
    })
}

// ---------------------------------------------------------------------------
// Records and tables
// ---------------------------------------------------------------------------

/// A record the store can own: it has a store-assigned id and optionally
/// exposes counters.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + From<String> + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;

    fn assign_id(&mut self, id: Self::Id);

    fn counter_mut(&mut self, _field: Counter) -> Option<&mut u64> {
        None
    }
}

macro_rules! impl_record {
    ($record:ty, $id:ty, $kind:expr) => {
        impl_record!($record, $id, $kind, |_record, _field| None);
    };
    ($record:ty, $id:ty, $kind:expr, |$r:ident, $f:ident| $counters:expr) => {
        impl Record for $record {
            type Id = $id;

            const KIND: EntityKind = $kind;

            fn id(&self) -> &Self::Id {
                &self.id
            }

            fn assign_id(&mut self, id: Self::Id) {
                self.id = id;
            }

            #[allow(unused_variables)]
            fn counter_mut(&mut self, field: Counter) -> Option<&mut u64> {
                let $r = self;
                let $f = field;
                $counters
            }
        }
    };
}

impl_record!(Startup, StartupId, EntityKind::Startup, |startup, field| {
    match field {
        Counter::Views => Some(&mut startup.stats.views),
        Counter::Likes => Some(&mut startup.stats.likes),
        Counter::Bookmarks => Some(&mut startup.stats.bookmarks),
        Counter::Followers => Some(&mut startup.stats.followers),
        Counter::Following => None,
    }
});
impl_record!(User, UserId, EntityKind::User, |user, field| {
    match field {
        Counter::Followers => Some(&mut user.followers),
        Counter::Following => Some(&mut user.following),
        _ => None,
    }
});
impl_record!(Group, GroupId, EntityKind::Group, |group, field| {
    match field {
        Counter::Followers => Some(&mut group.followers),
        _ => None,
    }
});
impl_record!(Update, UpdateId, EntityKind::Update);
impl_record!(Comment, CommentId, EntityKind::Comment);
impl_record!(Like, LikeId, EntityKind::Like);
impl_record!(Notification, NotificationId, EntityKind::Notification);

struct Row<T> {
    seq: u64,
    record: Arc<RwLock<T>>,
}

/// One collection of records with per-record locking.
pub struct Table<T: Record> {
    rows: DashMap<T::Id, Row<T>>,
    next_seq: AtomicU64,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Records are plain data, so a panic mid-write cannot leave them torn in a
// way later readers care about.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn handle(&self, id: &T::Id) -> Result<Arc<RwLock<T>>> {
        self.rows
            .get(id)
            .map(|row| Arc::clone(&row.record))
            .ok_or_else(|| EngagementError::not_found(T::KIND, id))
    }

    /// Store `record` under a freshly generated id and return the id.
    pub fn insert(&self, record: T) -> T::Id {
        self.insert_and_get(record).id().clone()
    }

    /// Like [`Table::insert`], returning the stored record.
    pub fn insert_and_get(&self, mut record: T) -> T {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        loop {
            let id = T::Id::from(generate_id());
            match self.rows.entry(id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    record.assign_id(id);
                    let stored = record.clone();
                    slot.insert(Row {
                        seq,
                        record: Arc::new(RwLock::new(record)),
                    });
                    return stored;
                }
            }
        }
    }

    pub fn get(&self, id: &T::Id) -> Result<T> {
        let handle = self.handle(id)?;
        let record = read_lock(&handle).clone();
        Ok(record)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records matching `predicate`, in insertion order.
    pub fn list(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut handles: Vec<(u64, Arc<RwLock<T>>)> = self
            .rows
            .iter()
            .map(|row| (row.seq, Arc::clone(&row.record)))
            .collect();
        handles.sort_by_key(|(seq, _)| *seq);

        handles
            .into_iter()
            .filter_map(|(_, handle)| {
                let record = read_lock(&handle);
                predicate(&*record).then(|| record.clone())
            })
            .collect()
    }

    /// Run `mutate` with exclusive access to one record.
    pub fn update<R>(&self, id: &T::Id, mutate: impl FnOnce(&mut T) -> R) -> Result<R> {
        let handle = self.handle(id)?;
        let mut record = write_lock(&handle);
        Ok(mutate(&mut *record))
    }

    /// Atomically add `delta` to a counter and return the new value.
    pub fn increment(&self, id: &T::Id, field: Counter, delta: i64) -> Result<u64> {
        let handle = self.handle(id)?;
        let mut record = write_lock(&handle);
        let counter = record
            .counter_mut(field)
            .ok_or_else(|| EngagementError::InvalidField {
                kind: T::KIND,
                field: field.to_string(),
            })?;
        let next = apply_delta(*counter, delta, field)?;
        *counter = next;
        Ok(next)
    }

    /// Optimistic variant of [`Table::increment`]: applies only when the
    /// counter still holds `expected`.
    pub fn compare_and_increment(
        &self,
        id: &T::Id,
        field: Counter,
        expected: u64,
        delta: i64,
    ) -> Result<u64> {
        let handle = self.handle(id)?;
        let mut record = write_lock(&handle);
        let counter = record
            .counter_mut(field)
            .ok_or_else(|| EngagementError::InvalidField {
                kind: T::KIND,
                field: field.to_string(),
            })?;
        if *counter != expected {
            return Err(EngagementError::ConcurrencyConflict {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        let next = apply_delta(*counter, delta, field)?;
        *counter = next;
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Notification log
// ---------------------------------------------------------------------------

/// Append-only notification history with a single append point.
#[derive(Default)]
pub struct NotificationLog {
    table: Table<Notification>,
    last_created_at: Mutex<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationLog {
    /// Assign id and `createdAt`, persist, and return the stored record.
    /// New notifications always start unread.
    pub fn append(&self, mut notification: Notification) -> Notification {
        let mut last = lock(&self.last_created_at);
        let created_at = now_millis().max(*last);
        *last = created_at;
        notification.created_at = created_at;
        notification.read = false;
        self.table.insert_and_get(notification)
    }

    pub fn get(&self, id: &NotificationId) -> Result<Notification> {
        self.table.get(id)
    }

    /// Notifications for `user` (all users when `None`), newest first.
    pub fn list_for(&self, user: Option<&UserId>) -> Vec<Notification> {
        let mut items = self
            .table
            .list(|n| user.map_or(true, |user| &n.user_id == user));
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn mark_read(&self, id: &NotificationId) -> Result<Notification> {
        self.table.update(id, |n| {
            n.read = true;
            n.clone()
        })
    }

    /// Mark every unread notification for `user` as read; returns how many
    /// changed.
    pub fn mark_all_read(&self, user: &UserId) -> usize {
        self.table
            .list(|n| &n.user_id == user && !n.read)
            .into_iter()
            .filter(|n| {
                self.table
                    .update(&n.id, |n| std::mem::replace(&mut n.read, true))
                    .is_ok_and(|was_read| !was_read)
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entity store
// ---------------------------------------------------------------------------

/// Canonical state for every entity kind. Constructed once at startup and
/// shared behind an `Arc` by every component that needs it.
#[derive(Default)]
pub struct EntityStore {
    pub startups: Table<Startup>,
    pub users: Table<User>,
    pub groups: Table<Group>,
    pub updates: Table<Update>,
    pub comments: Table<Comment>,
    pub likes: Table<Like>,
    pub notifications: NotificationLog,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter increment addressed by kind and field name, for callers that
    /// only hold untyped identifiers.
    pub fn increment(&self, kind: EntityKind, id: &str, field: &str, delta: i64) -> Result<u64> {
        let counter = Counter::parse(kind, field)?;
        match kind {
            EntityKind::Startup => self.startups.increment(&StartupId::from(id), counter, delta),
            EntityKind::User => self.users.increment(&UserId::from(id), counter, delta),
            EntityKind::Group => self.groups.increment(&GroupId::from(id), counter, delta),
            _ => Err(EngagementError::InvalidField {
                kind,
                field: field.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;
    use crate::model::NotificationKind;

    fn store_with_startup() -> (EntityStore, StartupId) {
        let store = EntityStore::new();
        let owner = store.users.insert(User::new("Owner", "owner"));
        let id = store
            .startups
            .insert(Startup::new(owner, "Acme", "Rockets", "Tech", 1_000));
        (store, id)
    }

    fn draft(user: &UserId, startup: &StartupId) -> Notification {
        Notification {
            id: NotificationId::default(),
            user_id: user.clone(),
            kind: NotificationKind::Like,
            startup_id: startup.clone(),
            actor_id: None,
            update_id: None,
            text: None,
            created_at: 0,
            read: true,
        }
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let store = EntityStore::new();
        let ids: HashSet<UserId> = (0..200)
            .map(|i| store.users.insert(User::new(format!("User {i}"), format!("user{i}"))))
            .collect();
        assert_eq!(ids.len(), 200);
        for id in &ids {
            assert_eq!(id.as_str().len(), ID_LEN);
            assert_eq!(&store.users.get(id).unwrap().id, id);
        }
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = EntityStore::new();
        let names: Vec<String> = (0..5).map(|i| format!("User {i}")).collect();
        for name in &names {
            store.users.insert(User::new(name.clone(), name.to_lowercase()));
        }
        let listed: Vec<String> = store.users.list(|_| true).into_iter().map(|u| u.name).collect();
        assert_eq!(listed, names);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = EntityStore::new();
        let err = store.startups.get(&StartupId::from("missing")).unwrap_err();
        assert!(matches!(
            err,
            EngagementError::NotFound {
                kind: EntityKind::Startup,
                ..
            }
        ));
    }

    #[test]
    fn test_increment_returns_new_value() {
        let (store, id) = store_with_startup();
        assert_eq!(store.startups.increment(&id, Counter::Likes, 1).unwrap(), 1);
        assert_eq!(store.startups.increment(&id, Counter::Likes, 1).unwrap(), 2);
        assert_eq!(store.startups.increment(&id, Counter::Views, 10).unwrap(), 10);
        let stats = store.startups.get(&id).unwrap().stats;
        assert_eq!(stats.likes, 2);
        assert_eq!(stats.views, 10);
        assert_eq!(stats.bookmarks, 0);
    }

    #[test]
    fn test_increment_missing_record() {
        let store = EntityStore::new();
        let err = store
            .increment(EntityKind::Startup, "nope", "likes", 1)
            .unwrap_err();
        assert!(matches!(err, EngagementError::NotFound { .. }));
    }

    #[test]
    fn test_increment_unknown_field() {
        let (store, id) = store_with_startup();
        let err = store
            .increment(EntityKind::Startup, id.as_str(), "shares", 1)
            .unwrap_err();
        assert!(matches!(err, EngagementError::InvalidField { .. }));

        let err = store.startups.increment(&id, Counter::Following, 1).unwrap_err();
        assert!(matches!(err, EngagementError::InvalidField { .. }));

        let err = store
            .increment(EntityKind::Comment, "whatever", "likes", 1)
            .unwrap_err();
        assert!(matches!(err, EngagementError::InvalidField { .. }));
    }

    #[test]
    fn test_counter_never_goes_negative() {
        let (store, id) = store_with_startup();
        store.startups.increment(&id, Counter::Bookmarks, 2).unwrap();
        let err = store.startups.increment(&id, Counter::Bookmarks, -3).unwrap_err();
        assert!(matches!(err, EngagementError::Validation(_)));
        assert_eq!(store.startups.get(&id).unwrap().stats.bookmarks, 2);
    }

    #[test]
    fn test_dynamic_increment_on_users_and_groups() {
        let store = EntityStore::new();
        let user = store.users.insert(User::new("A", "a"));
        assert_eq!(
            store
                .increment(EntityKind::User, user.as_str(), "following", 3)
                .unwrap(),
            3
        );
        let group = store.groups.insert(Group {
            id: GroupId::default(),
            name: "Tech Founders".to_string(),
            description: String::new(),
            followers: 5,
            threads: Vec::new(),
        });
        assert_eq!(
            store
                .increment(EntityKind::Group, group.as_str(), "followers", 1)
                .unwrap(),
            6
        );
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (store, id) = store_with_startup();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        store.startups.increment(&id, Counter::Likes, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.startups.get(&id).unwrap().stats.likes, 2_000);
    }

    #[test]
    fn test_compare_and_increment_detects_stale_value() {
        let (store, id) = store_with_startup();
        assert_eq!(
            store
                .startups
                .compare_and_increment(&id, Counter::Likes, 0, 1)
                .unwrap(),
            1
        );
        let err = store
            .startups
            .compare_and_increment(&id, Counter::Likes, 0, 1)
            .unwrap_err();
        assert!(matches!(err, EngagementError::ConcurrencyConflict { .. }));
        assert_eq!(store.startups.get(&id).unwrap().stats.likes, 1);
    }

    #[test]
    fn test_notifications_are_monotonic_and_newest_first() {
        let (store, startup) = store_with_startup();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let mut appended = Vec::new();
        for i in 0..20 {
            let user = if i % 2 == 0 { &alice } else { &bob };
            appended.push(store.notifications.append(draft(user, &startup)));
        }
        for pair in appended.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        assert!(appended.iter().all(|n| !n.read));

        let for_alice = store.notifications.list_for(Some(&alice));
        assert_eq!(for_alice.len(), 10);
        assert!(for_alice.iter().all(|n| n.user_id == alice));
        let expected: Vec<_> = appended
            .iter()
            .rev()
            .filter(|n| n.user_id == alice)
            .map(|n| n.id.clone())
            .collect();
        let actual: Vec<_> = for_alice.iter().map(|n| n.id.clone()).collect();
        assert_eq!(actual, expected);

        assert_eq!(store.notifications.list_for(None).len(), 20);
    }

    #[test]
    fn test_mark_read() {
        let (store, startup) = store_with_startup();
        let alice = UserId::from("alice");
        let first = store.notifications.append(draft(&alice, &startup));
        store.notifications.append(draft(&alice, &startup));
        store.notifications.append(draft(&UserId::from("bob"), &startup));

        assert!(store.notifications.mark_read(&first.id).unwrap().read);
        assert_eq!(store.notifications.mark_all_read(&alice), 1);
        assert_eq!(store.notifications.mark_all_read(&alice), 0);
        assert!(store
            .notifications
            .list_for(Some(&alice))
            .iter()
            .all(|n| n.read));
        assert!(matches!(
            store.notifications.mark_read(&NotificationId::from("nope")),
            Err(EngagementError::NotFound { .. })
        ));
    }
}
