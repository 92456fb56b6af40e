//! Authentication state shared by the API client and every screen.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::scope::ScopeContext;
use crate::storage::{self, Storage, AUTH_TOKEN_KEY, SESSION_KEYS, USER_KEY};

/// The signed-in user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token, user and scope, mirrored to [`Storage`].
pub struct Session {
    storage: Arc<dyn Storage>,
    token: RwLock<Option<String>>,
    user: RwLock<Option<User>>,
    scope: ScopeContext,
}

impl Session {
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let token: Option<String> = storage::read_json(storage.as_ref(), AUTH_TOKEN_KEY);
        let user: Option<User> = storage::read_json(storage.as_ref(), USER_KEY);
        let scope = ScopeContext::load(storage.clone());
        Self {
            storage,
            token: RwLock::new(token),
            user: RwLock::new(user),
            scope,
        }
    }

    pub fn scope(&self) -> &ScopeContext {
        &self.scope
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Persist a fresh login.
    pub fn sign_in(&self, token: String, user: User) -> Result<(), ClientError> {
        storage::write_json(self.storage.as_ref(), AUTH_TOKEN_KEY, &token)?;
        storage::write_json(self.storage.as_ref(), USER_KEY, &user)?;
        tracing::info!(username = ?user.username, "Signed in");
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
        Ok(())
    }

    /// Explicit logout: clears token, user and scope.
    pub fn sign_out(&self) -> Result<(), ClientError> {
        self.clear_memory();
        for key in SESSION_KEYS {
            self.storage.remove(key)?;
        }
        tracing::info!("Signed out");
        Ok(())
    }

    /// The backend answered 401: drop everything so the next action
    /// requires a new login. Storage failures are logged, not returned.
    pub fn expire(&self) {
        self.clear_memory();
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::error!(key, error = %e, "Failed to clear client state");
            }
        }
        tracing::info!("Session expired, client state cleared");
    }

    fn clear_memory(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.scope.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, SCOPE_KEY};
    use eduadmin_core::filter::FilterNode;
    use eduadmin_core::scope::SelectedScope;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({"id": 1, "username": "admin", "role": "admin"}))
            .unwrap()
    }

    fn scope() -> SelectedScope {
        SelectedScope {
            country: FilterNode::new(1, "Egypt"),
            curriculum: FilterNode::new(2, "National"),
            stage: FilterNode::new(3, "Primary"),
            grade: FilterNode::new(4, "Grade 4"),
            subject: None,
        }
    }

    #[test]
    fn test_sign_in_persists_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let session = Session::load(storage.clone());
        assert!(!session.is_authenticated());

        session.sign_in("tok".into(), user()).unwrap();
        let reloaded = Session::load(storage);
        assert_eq!(reloaded.token().as_deref(), Some("tok"));
        assert_eq!(reloaded.user(), Some(user()));
        assert_eq!(reloaded.user().unwrap().extra["id"], 1);
    }

    #[test]
    fn test_expire_clears_all_three_keys() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let session = Session::load(storage.clone());
        session.sign_in("tok".into(), user()).unwrap();
        session.scope().select_subject(scope()).unwrap();

        session.expire();

        assert!(session.token().is_none());
        assert!(session.user().is_none());
        assert!(session.scope().current().is_none());
        for key in [AUTH_TOKEN_KEY, USER_KEY, SCOPE_KEY] {
            assert!(storage.get(key).unwrap().is_none(), "{key} should be cleared");
        }
    }

    #[test]
    fn test_sign_out_clears_scope() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let session = Session::load(storage.clone());
        session.scope().select_subject(scope()).unwrap();
        session.sign_out().unwrap();
        assert!(storage.get(SCOPE_KEY).unwrap().is_none());
    }
}
