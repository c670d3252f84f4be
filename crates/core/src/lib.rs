#![warn(clippy::all)]

//! Core domain logic for the shelfside rental tracker.
//!
//! This crate hosts the data models, the rental state machine with its
//! batch-cascade planning, the catalog filter engine, the debounced
//! search input, configuration handling and the HTTP client used by
//! the terminal UI and any future frontends.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod rental;
pub mod session;

pub use api::{ApiClient, AuthResponse, NewGame, ProductHit};
pub use catalog::{CatalogCache, CatalogFilter, DifficultyBand, PlayerTarget, SearchDebouncer};
pub use config::AppConfig;
pub use error::RentalError;
pub use models::{ConfigItem, GameRecord, GameStatus, PlayerRange, RentalLogEntry, UserRecord};
pub use rental::{
    ActionContext, ActionOutcome, CascadeChoice, CatalogStore, GameEdit, PromptProvider,
    RentalAction, RentalDesk,
};
pub use session::SessionContext;
