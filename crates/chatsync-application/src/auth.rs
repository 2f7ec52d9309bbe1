//! Shared authentication state.

use chatsync_core::UserIdentity;
use std::sync::{PoisonError, RwLock};

/// The currently authenticated user, shared by every repository.
///
/// Reads are synchronous so routing decisions never await.
#[derive(Debug, Default)]
pub struct AuthContext {
    user: RwLock<Option<UserIdentity>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<UserIdentity> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn set(&self, user: Option<UserIdentity>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let auth = AuthContext::new();
        assert!(!auth.is_authenticated());

        auth.set(Some(UserIdentity::new("user-1", "token")));
        assert_eq!(auth.current().unwrap().user_id, "user-1");

        auth.set(None);
        assert!(auth.current().is_none());
    }
}
