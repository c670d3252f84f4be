//! Rental state machine: the transition table, the cascade planning
//! logic and the desk that drives confirmation-gated requests against
//! the persistence collaborator.

pub mod desk;
pub mod plan;
pub mod store;
pub mod transitions;

pub use desk::{ActionOutcome, PromptProvider, RentalDesk};
pub use plan::{plan_action, ActionContext, ActionPlan, CascadeChoice, PromptSpec, StoreRequest};
pub use store::{CatalogStore, GameEdit};
pub use transitions::{apply, legal_actions, RentalAction, RenterEffect, Transition};
