//! AND-combined predicates over the priority-sorted collection.
//!
//! Filtering is pure and order-preserving: the output keeps the
//! upstream sort-priority order and never re-sorts.

use crate::models::{GameRecord, GameStatus};

/// Sentinel label shown for the "no category filter" option.
pub const ALL_CATEGORIES: &str = "전체";

/// Difficulty band the UI cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifficultyBand {
    #[default]
    All,
    /// 입문: difficulty < 2.0
    Intro,
    /// 초중급: 2.0 <= difficulty < 3.0
    Light,
    /// 전략: difficulty >= 3.0
    Strategy,
}

impl DifficultyBand {
    pub fn label(self) -> &'static str {
        match self {
            DifficultyBand::All => "전체",
            DifficultyBand::Intro => "입문",
            DifficultyBand::Light => "초중급",
            DifficultyBand::Strategy => "전략",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DifficultyBand::All => DifficultyBand::Intro,
            DifficultyBand::Intro => DifficultyBand::Light,
            DifficultyBand::Light => DifficultyBand::Strategy,
            DifficultyBand::Strategy => DifficultyBand::All,
        }
    }

    /// Records without a difficulty score pass every band; the band
    /// filters on the score when one exists.
    fn passes(self, difficulty: Option<f32>) -> bool {
        let Some(score) = difficulty else {
            return true;
        };
        match self {
            DifficultyBand::All => true,
            DifficultyBand::Intro => score < 2.0,
            DifficultyBand::Light => (2.0..3.0).contains(&score),
            DifficultyBand::Strategy => score >= 3.0,
        }
    }
}

/// Player-count target, either a specific table size or "6+".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerTarget {
    #[default]
    All,
    Exactly(u32),
    SixPlus,
}

impl PlayerTarget {
    pub fn label(self) -> String {
        match self {
            PlayerTarget::All => "전체".to_string(),
            PlayerTarget::Exactly(count) => format!("{count}인"),
            PlayerTarget::SixPlus => "6인+".to_string(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            PlayerTarget::All => PlayerTarget::Exactly(2),
            PlayerTarget::Exactly(count) if count < 5 => PlayerTarget::Exactly(count + 1),
            PlayerTarget::Exactly(_) => PlayerTarget::SixPlus,
            PlayerTarget::SixPlus => PlayerTarget::All,
        }
    }

    /// A missing or malformed players string fails any active target.
    fn passes(self, game: &GameRecord) -> bool {
        match self {
            PlayerTarget::All => true,
            PlayerTarget::Exactly(count) => game
                .player_range()
                .map(|range| range.fits(count))
                .unwrap_or(false),
            PlayerTarget::SixPlus => game
                .player_range()
                .map(|range| range.max >= 6)
                .unwrap_or(false),
        }
    }
}

/// The six independent, AND-combined predicates of the catalog view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Committed search term. `#`-prefixed terms match the tag string
    /// verbatim; anything else is a case-insensitive name substring.
    pub search: String,
    /// Admin-only renter substring filter.
    pub renter: String,
    /// Selected category; `None` is the "all" sentinel.
    pub category: Option<String>,
    pub difficulty: DifficultyBand,
    pub players: PlayerTarget,
    pub available_only: bool,
}

impl CatalogFilter {
    pub fn matches(&self, game: &GameRecord) -> bool {
        self.matches_search(game)
            && self.matches_renter(game)
            && self.matches_category(game)
            && self.difficulty.passes(game.difficulty)
            && self.players.passes(game)
            && (!self.available_only || game.status == GameStatus::Available)
    }

    /// Pure, stable filter pass over a snapshot.
    pub fn apply(&self, games: &[GameRecord]) -> Vec<GameRecord> {
        games
            .iter()
            .filter(|game| self.matches(game))
            .cloned()
            .collect()
    }

    /// Restore every field to its sentinel in one update.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn matches_search(&self, game: &GameRecord) -> bool {
        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        if term.starts_with('#') {
            game.tags.contains(term)
        } else {
            game.name.to_lowercase().contains(&term.to_lowercase())
        }
    }

    fn matches_renter(&self, game: &GameRecord) -> bool {
        let needle = self.renter.trim();
        if needle.is_empty() {
            return true;
        }
        game.renter()
            .map(|renter| renter.contains(needle))
            .unwrap_or(false)
    }

    fn matches_category(&self, game: &GameRecord) -> bool {
        match self.category.as_deref() {
            None => true,
            Some(selected) => game.category() == selected,
        }
    }
}

/// The sentinel followed by distinct, non-empty categories in
/// first-seen order.
pub fn category_options(games: &[GameRecord]) -> Vec<String> {
    let mut options = vec![ALL_CATEGORIES.to_string()];
    for game in games {
        let category = game.category();
        if !options.iter().any(|seen| seen == category) {
            options.push(category.to_string());
        }
    }
    options
}
