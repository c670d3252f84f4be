//! Shared snapshot of the last successful catalog fetch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::models::{self, GameRecord};

/// Thread-safe, non-authoritative snapshot of the game collection.
///
/// The snapshot is replaced wholesale after every successful mutation
/// (reload-after-write); nothing ever patches individual records, so a
/// failed request leaves the view exactly as it was.
#[derive(Clone, Default)]
pub struct CatalogCache {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    games: Vec<GameRecord>,
    fetched_at: Option<DateTime<Utc>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh snapshot, applying the canonical priority sort.
    pub fn install(&self, mut games: Vec<GameRecord>) {
        models::sort_by_priority(&mut games);
        let mut inner = self.inner.write();
        inner.games = games;
        inner.fetched_at = Some(Utc::now());
    }

    /// Clone of the current snapshot in priority order.
    pub fn games(&self) -> Vec<GameRecord> {
        self.inner.read().games.clone()
    }

    /// Look up one record by id.
    pub fn game(&self, id: i64) -> Option<GameRecord> {
        self.inner.read().games.iter().find(|game| game.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().games.is_empty()
    }

    /// When the snapshot was last refreshed, if ever.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().fetched_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;

    fn record(id: i64, status: GameStatus) -> GameRecord {
        GameRecord {
            id,
            name: format!("게임{id}"),
            category: String::new(),
            status,
            renter: None,
            tags: String::new(),
            difficulty: None,
            players: None,
            genre: String::new(),
            image: String::new(),
            bgg_id: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn install_applies_priority_sort() {
        let cache = CatalogCache::new();
        cache.install(vec![
            record(1, GameStatus::Available),
            record(2, GameStatus::Dibs),
            record(3, GameStatus::Rented),
        ]);
        let order: Vec<i64> = cache.games().iter().map(|game| game.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!(cache.fetched_at().is_some());
    }
}
