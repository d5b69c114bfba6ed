//! Demo data for a fresh in-memory store.
//!
//! Kept apart from the core: nothing else depends on how (or whether) the
//! store was seeded. Pass a seeded RNG for reproducible data.

use std::collections::BTreeMap;

use rand::Rng;

use crate::model::{
    now_millis, Group, GroupId, Reply, ReplyId, Startup, Stats, TeamMember, TeamMemberId, Thread,
    ThreadId, User, UserId,
};
use crate::store::{generate_id, EntityStore};

pub const CATEGORIES: [&str; 8] = [
    "Tech",
    "Health",
    "Education",
    "Finance",
    "Climate",
    "AI",
    "SaaS",
    "Consumer",
];

const SAMPLE_IMAGES: [&str; 8] = [
    "https://images.unsplash.com/photo-1518770660439-4636190af475",
    "https://images.unsplash.com/photo-1518779578993-ec3579fee39f",
    "https://images.unsplash.com/photo-1498050108023-c5249f4df085",
    "https://images.unsplash.com/photo-1487058792275-0ad4aaf24ca7",
    "https://images.unsplash.com/photo-1551836022-d5d88e9218df",
    "https://images.unsplash.com/photo-1520607162513-77705c0f0d4a",
    "https://images.unsplash.com/photo-1521737604893-d14cc237f11d",
    "https://images.unsplash.com/photo-1553877522-43269d4ea984",
];

const USER_COUNT: usize = 12;
const STARTUP_COUNT: usize = 24;
const THREADS_PER_GROUP: usize = 6;
const REPLIES_PER_THREAD: usize = 3;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub startups: usize,
    pub groups: usize,
}

pub fn seed_demo_data<R: Rng + ?Sized>(store: &EntityStore, rng: &mut R) -> SeedSummary {
    let now = now_millis();

    let users: Vec<UserId> = (1..=USER_COUNT)
        .map(|i| {
            let mut user = User::new(format!("User {i}"), format!("user{i}"));
            user.avatar = format!("https://i.pravatar.cc/150?img={i}");
            user.bio = "Entrepreneur and builder passionate about innovation.".to_string();
            user.followers = rng.gen_range(0..5_000);
            user.following = rng.gen_range(0..1_000);
            store.users.insert(user)
        })
        .collect();

    for i in 0..STARTUP_COUNT {
        let image = SAMPLE_IMAGES[i % SAMPLE_IMAGES.len()];
        let second = SAMPLE_IMAGES[(i + 3) % SAMPLE_IMAGES.len()];
        let mut startup = Startup::new(
            users[i % users.len()].clone(),
            format!("Startup {}", i + 1),
            "A bold vision to reshape the industry with an elegant solution. \
             Clear problem, sharp focus, and a path to scale.",
            CATEGORIES[i % CATEGORIES.len()],
            now.saturating_sub(rng.gen_range(0..60 * DAY_MS)),
        );
        startup.logo = format!("https://api.dicebear.com/7.x/shapes/svg?seed={}", i + 1);
        startup.banner = image.to_string();
        startup.media = vec![
            format!("{image}&w=1200&q=80"),
            format!("{second}&w=1200&q=80"),
        ];
        startup.website = "https://example.com".to_string();
        startup.links = BTreeMap::from([
            ("twitter".to_string(), "https://x.com/example".to_string()),
            (
                "linkedin".to_string(),
                "https://linkedin.com/company/example".to_string(),
            ),
        ]);
        startup.team = [
            ("Alex Johnson", "CEO"),
            ("Priya Singh", "CTO"),
            ("Luis Martinez", "Product Lead"),
        ]
        .iter()
        .enumerate()
        .map(|(n, (name, role))| TeamMember {
            id: TeamMemberId::from(generate_id()),
            name: name.to_string(),
            role: role.to_string(),
            photo: format!("https://i.pravatar.cc/150?img={}", (i % 70) + n + 1),
        })
        .collect();
        startup.stats = Stats {
            views: 1_000 + rng.gen_range(0..5_000),
            likes: 200 + rng.gen_range(0..1_500),
            bookmarks: 50 + rng.gen_range(0..500),
            followers: 100 + rng.gen_range(0..3_000),
        };
        store.startups.insert(startup);
    }

    for (idx, category) in CATEGORIES.iter().enumerate() {
        let threads = (0..THREADS_PER_GROUP)
            .map(|t| Thread {
                id: ThreadId::from(generate_id()),
                title: format!("{category} thread {}", t + 1),
                author_id: users[(idx + t) % users.len()].clone(),
                body: "Let's discuss key challenges and share practical tips for traction."
                    .to_string(),
                created_at: now.saturating_sub(rng.gen_range(0..7 * DAY_MS)),
                replies: (0..REPLIES_PER_THREAD)
                    .map(|r| Reply {
                        id: ReplyId::from(generate_id()),
                        author_id: users[(idx + t + r + 1) % users.len()].clone(),
                        body: "Great point! Here's what worked for us in early days.".to_string(),
                        created_at: now.saturating_sub(rng.gen_range(0..7 * DAY_MS)),
                    })
                    .collect(),
            })
            .collect();
        store.groups.insert(Group {
            id: GroupId::default(),
            name: format!("{category} Founders"),
            description: format!("{category} sector discussions, resources, and founder support."),
            followers: 50 + rng.gen_range(0..3_000),
            threads,
        });
    }

    SeedSummary {
        users: users.len(),
        startups: STARTUP_COUNT,
        groups: CATEGORIES.len(),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn test_seed_counts() {
        let store = EntityStore::new();
        let summary = seed_demo_data(&store, &mut ChaCha20Rng::seed_from_u64(7));
        assert_eq!(summary.users, 12);
        assert_eq!(store.users.len(), 12);
        assert_eq!(store.startups.len(), 24);
        assert_eq!(store.groups.len(), 8);
        assert!(store.notifications.is_empty());
    }

    #[test]
    fn test_seeded_startups_reference_seeded_owners() {
        let store = EntityStore::new();
        seed_demo_data(&store, &mut ChaCha20Rng::seed_from_u64(1));
        for startup in store.startups.list(|_| true) {
            assert!(store.users.contains(&startup.owner_id));
            assert!(startup.stats.likes >= 200);
            assert!(CATEGORIES.contains(&startup.category.as_str()));
        }
        for group in store.groups.list(|_| true) {
            assert_eq!(group.threads.len(), 6);
            assert!(group.threads.iter().all(|t| t.replies.len() == 3));
        }
    }

    #[test]
    fn test_same_seed_same_counters() {
        let counters = |seed| {
            let store = EntityStore::new();
            seed_demo_data(&store, &mut ChaCha20Rng::seed_from_u64(seed));
            store
                .startups
                .list(|_| true)
                .into_iter()
                .map(|s| s.stats)
                .collect::<Vec<_>>()
        };
        assert_eq!(counters(42), counters(42));
    }
}
