//! Authenticated user identity.
//!
//! Authentication itself happens elsewhere; this crate only carries the result.

use serde::{Deserialize, Serialize};

/// The user on whose behalf remote queries run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user id; every remote row is scoped by it.
    pub user_id: String,
    /// Bearer token presented to the remote store.
    pub access_token: String,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}
