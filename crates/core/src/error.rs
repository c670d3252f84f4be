//! Error types shared across the core.

use thiserror::Error;

use crate::models::GameStatus;
use crate::rental::RentalAction;

/// Failures surfaced by the rental desk and its collaborators.
///
/// Nothing here is fatal: every variant is recoverable by retrying the
/// action or reloading the view.
#[derive(Debug, Error)]
pub enum RentalError {
    /// Rejected before any request was sent (e.g. empty required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The persistence collaborator refused or failed the request. The
    /// local view is left untouched when this is returned.
    #[error("request failed: {0}")]
    Persistence(String),

    /// Wrong admin password or a failed login/signup.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested action is not in the transition table.
    #[error("cannot {action:?} a game that is {from:?}")]
    IllegalTransition {
        from: GameStatus,
        action: RentalAction,
    },

    /// No record with the given id in the current snapshot.
    #[error("unknown game id {0}")]
    UnknownGame(i64),
}

impl RentalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}
