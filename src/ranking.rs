//! Trending score and feed ordering.
//!
//! `score = likes + bookmarks + 0.1 * views`. There is no time decay: an old
//! startup with high counters keeps ranking high.
//!
//! Ordering compares scores in integer tenths so that equal scores are
//! detected exactly; ties fall back to `createdAt` descending and then `id`
//! ascending.

use std::cmp::Ordering;

use crate::model::{Startup, Stats};

/// Weight applied to views relative to likes and bookmarks.
pub const VIEW_WEIGHT: f64 = 0.1;

pub fn score(stats: &Stats) -> f64 {
    stats.likes as f64 + stats.bookmarks as f64 + stats.views as f64 * VIEW_WEIGHT
}

/// The score multiplied by ten, computed without floating point.
pub fn score_tenths(stats: &Stats) -> u128 {
    (stats.likes as u128 + stats.bookmarks as u128) * 10 + stats.views as u128
}

/// Highest score first.
pub fn compare_trending(a: &Startup, b: &Startup) -> Ordering {
    score_tenths(&b.stats)
        .cmp(&score_tenths(&a.stats))
        .then_with(|| compare_recent(a, b))
}

/// Newest first, `id` ascending on equal timestamps.
pub fn compare_recent(a: &Startup, b: &Startup) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_trending(startups: &mut [Startup]) {
    startups.sort_by(compare_trending);
}

pub fn sort_recent(startups: &mut [Startup]) {
    startups.sort_by(compare_recent);
}
