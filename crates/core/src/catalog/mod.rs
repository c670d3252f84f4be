//! Catalog filter engine: predicate evaluation over the game
//! collection, debounced search commit and the shared snapshot cache.

pub mod cache;
pub mod debounce;
pub mod filter;

pub use cache::CatalogCache;
pub use debounce::{SearchDebouncer, SEARCH_DEBOUNCE};
pub use filter::{category_options, CatalogFilter, DifficultyBand, PlayerTarget};
