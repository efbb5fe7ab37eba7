//! Process-wide session state

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, warn};

use super::storage::Storage;
use super::watchdog::TokenSource;
use super::UserProfile;
use crate::client::SessionListener;
use crate::error::Result;
use crate::token::{self, Clock, SystemClock};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "auth.token";

/// Storage key for the JSON-encoded user profile
pub const USER_KEY: &str = "auth.user";

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<UserProfile>,
    /// Whether changes are mirrored to durable storage
    persisted: bool,
}

/// Owner of the (token, user) pair and its durable mirror.
///
/// Only login, logout and refresh write; everything else reads.
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Restore the remembered session, purging it if the token has expired.
    pub fn init(storage: Arc<dyn Storage>) -> Self {
        Self::init_with_clock(storage, &SystemClock)
    }

    /// [`SessionStore::init`] with an explicit clock.
    pub fn init_with_clock(storage: Arc<dyn Storage>, clock: &dyn Clock) -> Self {
        let token = storage.get(TOKEN_KEY);
        let user = storage
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str::<UserProfile>(&raw).ok());

        let state = match token {
            Some(token) if token::is_expired_at(Some(&token), 0, clock.now()) => {
                debug!("Stored session token has expired, purging");
                purge(storage.as_ref());
                SessionState::default()
            }
            Some(token) => SessionState {
                token: Some(token),
                user,
                persisted: true,
            },
            None => {
                if storage.get(USER_KEY).is_some() {
                    debug!("Stored user profile has no token, purging");
                    purge(storage.as_ref());
                }
                SessionState::default()
            }
        };

        Self {
            state: RwLock::new(state),
            storage,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current bearer token
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// Current user profile
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    /// Whether the session survives a restart
    pub fn is_persisted(&self) -> bool {
        self.read().persisted
    }

    /// Start a session; `remember` mirrors it to durable storage.
    ///
    /// Without `remember` any previously remembered session is dropped.
    pub fn login(&self, token: String, user: Option<UserProfile>, remember: bool) -> Result<()> {
        if remember {
            self.storage.set(TOKEN_KEY, &token)?;
            match &user {
                Some(user) => self.storage.set(USER_KEY, &serde_json::to_string(user)?)?,
                None => self.storage.remove(USER_KEY)?,
            }
        } else {
            self.storage.remove(TOKEN_KEY)?;
            self.storage.remove(USER_KEY)?;
        }

        let mut state = self.write();
        state.token = Some(token);
        state.user = user;
        state.persisted = remember;
        Ok(())
    }

    /// Adopt a refreshed token.
    pub fn update_token(&self, token: &str) -> Result<()> {
        let persisted = {
            let mut state = self.write();
            state.token = Some(token.to_string());
            state.persisted
        };

        if persisted {
            self.storage.set(TOKEN_KEY, token)?;
        }
        Ok(())
    }

    /// End the session and purge both durable entries.
    pub fn logout(&self) -> Result<()> {
        *self.write() = SessionState::default();
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }
}

fn purge(storage: &dyn Storage) {
    for key in [TOKEN_KEY, USER_KEY] {
        if let Err(e) = storage.remove(key) {
            warn!("Failed to purge {}: {}", key, e);
        }
    }
}

impl SessionListener for SessionStore {
    fn token_refreshed(&self, token: &str) {
        if let Err(e) = self.update_token(token) {
            warn!("Failed to store refreshed token: {}", e);
        }
    }

    fn session_expired(&self) {
        if let Err(e) = self.logout() {
            warn!("Failed to clear expired session: {}", e);
        }
    }
}

impl TokenSource for SessionStore {
    fn current_token(&self) -> Option<String> {
        self.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use crate::token::test_support::{token_expiring_in, token_with_payload};
    use serde_json::json;

    fn user() -> UserProfile {
        UserProfile {
            username: Some("usertest01".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_init_restores_valid_session() {
        let storage = Arc::new(MemoryStorage::new());
        let token = token_expiring_in(3600);
        storage.set(TOKEN_KEY, &token).unwrap();
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();

        let store = SessionStore::init(storage);
        assert_eq!(store.token(), Some(token));
        assert_eq!(store.user(), Some(user()));
        assert!(store.is_persisted());
    }

    #[test]
    fn test_init_purges_expired_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, &token_expiring_in(-30)).unwrap();
        storage.set(USER_KEY, r#"{"username":"old"}"#).unwrap();

        let store = SessionStore::init(storage.clone());
        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn test_init_keeps_token_without_exp() {
        let storage = Arc::new(MemoryStorage::new());
        let token = token_with_payload(&json!({ "sub": "forever" }));
        storage.set(TOKEN_KEY, &token).unwrap();

        let store = SessionStore::init(storage);
        assert_eq!(store.token(), Some(token));
    }

    #[test]
    fn test_login_without_remember_does_not_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::init(storage.clone());

        store.login("t1".to_string(), Some(user()), false).unwrap();
        assert_eq!(store.token().as_deref(), Some("t1"));
        assert!(!store.is_persisted());
        assert!(storage.get(TOKEN_KEY).is_none());

        // Refreshes stay in memory too
        store.update_token("t2").unwrap();
        assert_eq!(store.token().as_deref(), Some("t2"));
        assert!(storage.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_login_without_remember_drops_remembered_session() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::init(storage.clone());
        store.login("alice-token".to_string(), Some(user()), true).unwrap();

        store.login("bob-token".to_string(), None, false).unwrap();
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());

        let restored = SessionStore::init(storage);
        assert!(restored.token().is_none());
        assert!(restored.user().is_none());
    }

    #[test]
    fn test_init_purges_user_without_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, r#"{"username":"stale"}"#).unwrap();

        let store = SessionStore::init(storage.clone());
        assert!(store.user().is_none());
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn test_login_with_remember_persists_both_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::init(storage.clone());

        store.login("t1".to_string(), Some(user()), true).unwrap();
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("t1"));
        let stored_user: UserProfile =
            serde_json::from_str(&storage.get(USER_KEY).unwrap()).unwrap();
        assert_eq!(stored_user, user());

        store.update_token("t2").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("t2"));
    }

    #[test]
    fn test_logout_purges_everything() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::init(storage.clone());
        store.login("t1".to_string(), Some(user()), true).unwrap();

        store.logout().unwrap();
        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert!(!store.is_persisted());
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn test_listener_hooks() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::init(storage.clone());
        store.login("t1".to_string(), None, true).unwrap();

        store.token_refreshed("t2");
        assert_eq!(store.current_token().as_deref(), Some("t2"));

        store.session_expired();
        assert!(store.current_token().is_none());
        assert!(storage.get(TOKEN_KEY).is_none());
    }
}
