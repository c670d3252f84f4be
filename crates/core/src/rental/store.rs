//! Persistence collaborator seam.

use serde::{Deserialize, Serialize};

use crate::error::RentalError;
use crate::models::{GameRecord, GameStatus};

/// Editable descriptive fields of a record; `id` and `status` are never
/// changed through an edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameEdit {
    pub name: String,
    pub category: String,
    pub difficulty: Option<f32>,
    pub genre: String,
    pub players: String,
    pub tags: String,
    pub image: String,
}

impl GameEdit {
    /// Prefill an edit form from an existing record.
    pub fn from_record(game: &GameRecord) -> Self {
        Self {
            name: game.name.clone(),
            category: game.category.clone(),
            difficulty: game.difficulty,
            genre: game.genre.clone(),
            players: game.players.clone().unwrap_or_default(),
            tags: game.tags.clone(),
            image: game.image.clone(),
        }
    }
}

/// Async persistence collaborator behind the rental desk.
///
/// Every call is one round trip; implementations must not mutate any
/// local view on failure. Implemented by [`crate::api::ApiClient`] and
/// by the in-memory store used in tests.
#[allow(async_fn_in_trait)]
pub trait CatalogStore {
    async fn fetch_games(&self) -> Result<Vec<GameRecord>, RentalError>;

    async fn update_game_status(
        &self,
        id: i64,
        status: GameStatus,
        renter: Option<&str>,
    ) -> Result<(), RentalError>;

    async fn edit_game(&self, id: i64, fields: &GameEdit) -> Result<(), RentalError>;

    async fn delete_game(&self, id: i64) -> Result<(), RentalError>;

    /// Batch-return every rented item of `renter`; returns the count.
    async fn return_all_by_renter(&self, renter: &str) -> Result<usize, RentalError>;

    /// Batch-confirm pickup of every hold of `renter`; returns the count.
    async fn approve_all_dibs_by_renter(&self, renter: &str) -> Result<usize, RentalError>;
}
