//! Filtered and sorted reads over the startup collection.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::Result;
use crate::model::{Startup, StartupId};
use crate::ranking;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Trending,
    /// `createdAt` descending. Used for any value other than `trending`.
    #[default]
    Recent,
}

impl FromStr for SortOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "trending" => SortOrder::Trending,
            _ => SortOrder::Recent,
        })
    }
}

/// Feed filters as they arrive on the query string. Empty strings are
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl FeedQuery {
    pub fn sort_order(&self) -> SortOrder {
        self.sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn term(&self) -> Option<String> {
        self.q
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

fn matches(startup: &Startup, term: Option<&str>, category: Option<&str>) -> bool {
    let text_ok = term.map_or(true, |term| {
        startup.title.to_lowercase().contains(term)
            || startup.description.to_lowercase().contains(term)
    });
    let category_ok = category.map_or(true, |category| startup.category == category);
    text_ok && category_ok
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<EntityStore>,
}

impl FeedService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Every matching startup; there is no pagination.
    pub fn list_startups(&self, query: &FeedQuery) -> Vec<Startup> {
        let term = query.term();
        let category = query.category();
        let mut startups = self
            .store
            .startups
            .list(|s| matches(s, term.as_deref(), category));

        match query.sort_order() {
            SortOrder::Trending => ranking::sort_trending(&mut startups),
            SortOrder::Recent => ranking::sort_recent(&mut startups),
        }
        startups
    }

    pub fn get_startup(&self, id: &StartupId) -> Result<Startup> {
        self.store.startups.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stats, UserId};

    fn seeded() -> FeedService {
        let store = Arc::new(EntityStore::new());
        let owner = UserId::from("owner");
        let rows = [
            ("Solar Grid", "Cheap storage for rooftops", "Climate", 3, (10, 2, 100)),
            ("MedTrack", "Hospital logistics", "Health", 5, (15, 0, 50)),
            ("GridPay", "Payments for energy co-ops", "Finance", 1, (1, 1, 1)),
            ("Tutorly", "AI tutors that SCALE", "Education", 4, (0, 0, 0)),
        ];
        for (title, description, category, created_at, (likes, bookmarks, views)) in rows {
            let mut s = Startup::new(owner.clone(), title, description, category, created_at);
            s.stats = Stats {
                views,
                likes,
                bookmarks,
                followers: 0,
            };
            store.startups.insert(s);
        }
        FeedService::new(store)
    }

    fn titles(startups: &[Startup]) -> Vec<&str> {
        startups.iter().map(|s| s.title.as_str()).collect()
    }

    fn query(q: Option<&str>, category: Option<&str>, sort: Option<&str>) -> FeedQuery {
        FeedQuery {
            q: q.map(str::to_string),
            category: category.map(str::to_string),
            sort: sort.map(str::to_string),
        }
    }

    #[test]
    fn test_default_sort_is_recent() {
        let feed = seeded();
        let result = feed.list_startups(&FeedQuery::default());
        assert_eq!(titles(&result), ["MedTrack", "Tutorly", "Solar Grid", "GridPay"]);
    }

    #[test]
    fn test_unknown_sort_falls_back_to_recent() {
        let feed = seeded();
        let result = feed.list_startups(&query(None, None, Some("popular")));
        assert_eq!(titles(&result), ["MedTrack", "Tutorly", "Solar Grid", "GridPay"]);
    }

    #[test]
    fn test_trending_sort() {
        let feed = seeded();
        let result = feed.list_startups(&query(None, None, Some("trending")));
        assert_eq!(titles(&result), ["Solar Grid", "MedTrack", "GridPay", "Tutorly"]);
    }

    #[test]
    fn test_text_filter_matches_title_or_description_case_insensitively() {
        let feed = seeded();
        let result = feed.list_startups(&query(Some("grid"), None, None));
        assert_eq!(titles(&result), ["Solar Grid", "GridPay"]);

        let result = feed.list_startups(&query(Some("scale"), None, None));
        assert_eq!(titles(&result), ["Tutorly"]);
    }

    #[test]
    fn test_filters_compose() {
        let feed = seeded();
        let result = feed.list_startups(&query(Some("grid"), Some("Finance"), None));
        assert_eq!(titles(&result), ["GridPay"]);

        let result = feed.list_startups(&query(Some("grid"), Some("Health"), None));
        assert!(result.is_empty());
    }

    #[test]
    fn test_category_is_exact_match() {
        let feed = seeded();
        assert!(feed
            .list_startups(&query(None, Some("health"), None))
            .is_empty());
        assert_eq!(
            titles(&feed.list_startups(&query(None, Some("Health"), None))),
            ["MedTrack"]
        );
    }

    #[test]
    fn test_empty_filters_are_ignored() {
        let feed = seeded();
        assert_eq!(feed.list_startups(&query(Some(""), Some(""), None)).len(), 4);
    }
}
