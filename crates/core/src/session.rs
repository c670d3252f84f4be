//! Explicit session context injected by the hosting shell.
//!
//! The core never reads authentication state ambiently; whoever drives
//! it (the TUI, a test) passes one of these in with each action.

use serde::{Deserialize, Serialize};

use crate::models::UserRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Whether the admin password gate has been passed.
    pub authenticated: bool,
    /// Logged-in member, if any.
    pub user: Option<UserRecord>,
}

impl SessionContext {
    /// Session with the admin gate passed.
    pub fn admin() -> Self {
        Self {
            authenticated: true,
            user: None,
        }
    }

    /// Session for a logged-in member.
    pub fn member(user: UserRecord) -> Self {
        Self {
            authenticated: false,
            user: Some(user),
        }
    }

    /// Display name of the logged-in member.
    pub fn user_name(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.name.as_str())
    }
}
