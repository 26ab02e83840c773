use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::api::{ApiError, TokenProvider};
use crate::data::AccountService;
use crate::favorites::{self, FavoritesError};
use crate::model::User;
use crate::storage::{self, SavedSession};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not signed in")]
    NotLoggedIn,
    #[error(transparent)]
    Favorites(#[from] FavoritesError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session storage: {0:#}")]
    Storage(anyhow::Error),
}

/// Bearer token shared between the session and the HTTP client.
#[derive(Debug, Default)]
pub struct SessionToken {
    token: RwLock<Option<String>>,
}

impl SessionToken {
    pub fn set(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

impl TokenProvider for SessionToken {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteChange {
    pub channel_id: String,
    pub favorited: bool,
    pub favorites: Vec<String>,
}

/// Who is signed in, plus the actions that change it. Created once at
/// startup; `login`/`resume` fill it and `logout` empties it.
pub struct Manager {
    store: Arc<storage::Store>,
    accounts: Arc<dyn AccountService>,
    token: Arc<SessionToken>,
    active: RwLock<Option<User>>,
}

impl Manager {
    pub fn new(
        store: Arc<storage::Store>,
        accounts: Arc<dyn AccountService>,
        token: Arc<SessionToken>,
    ) -> Self {
        Self {
            store,
            accounts,
            token,
            active: RwLock::new(None),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.active.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.active.read().is_some()
    }

    pub fn favorites(&self) -> Result<Vec<String>, SessionError> {
        match self.active.read().as_ref() {
            Some(user) => Ok(favorites::decode(user.favorites_field())?),
            None => Ok(Vec::new()),
        }
    }

    pub fn is_favorite(&self, channel_id: &str) -> bool {
        self.favorites()
            .map(|ids| favorites::contains(&ids, channel_id))
            .unwrap_or(false)
    }

    pub fn set_user(&self, user: User) {
        *self.active.write() = Some(user);
    }

    pub fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let auth = self.accounts.login(email, password)?;
        self.token.set(Some(auth.token.clone()));
        self.store
            .save_session(SavedSession {
                user_id: auth.user.id.clone(),
                email: auth.user.email.clone(),
                full_name: auth.user.full_name.clone(),
                token: auth.token,
                created_at: Default::default(),
                updated_at: Default::default(),
            })
            .map_err(SessionError::Storage)?;
        info!(user = %auth.user.id, "signed in");
        self.set_user(auth.user.clone());
        Ok(auth.user)
    }

    /// Restores the last stored session. A token the backend no longer
    /// accepts is forgotten.
    pub fn resume(&self) -> Result<Option<User>, SessionError> {
        let Some(saved) = self.store.latest_session().map_err(SessionError::Storage)? else {
            return Ok(None);
        };
        self.token.set(Some(saved.token.clone()));
        match self.accounts.auth_user() {
            Ok(user) => {
                info!(user = %user.id, "session resumed");
                self.set_user(user.clone());
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized) => {
                warn!(user = %saved.user_id, "stored session expired");
                self.token.set(None);
                self.store
                    .delete_session(&saved.user_id)
                    .map_err(SessionError::Storage)?;
                Ok(None)
            }
            Err(err) => {
                self.token.set(None);
                Err(err.into())
            }
        }
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        let Some(user) = self.current_user() else {
            return Ok(());
        };
        if let Err(err) = self.accounts.logout() {
            warn!(error = %err, "backend logout failed");
        }
        self.token.set(None);
        *self.active.write() = None;
        self.store
            .delete_session(&user.id)
            .map_err(SessionError::Storage)?;
        info!(user = %user.id, "signed out");
        Ok(())
    }

    pub fn toggle_favorite(&self, channel_id: &str) -> Result<FavoriteChange, SessionError> {
        let user = self.current_user().ok_or(SessionError::NotLoggedIn)?;
        let current = favorites::decode(user.favorites_field())?;
        let favorited = !favorites::contains(&current, channel_id);
        let next = if favorited {
            favorites::add(&current, channel_id)
        } else {
            favorites::remove(&current, channel_id)
        };
        let updated = self
            .accounts
            .update_user(&user.full_name, &favorites::encode(&next))?;
        self.set_user(updated);
        Ok(FavoriteChange {
            channel_id: channel_id.to_string(),
            favorited,
            favorites: next,
        })
    }

    pub fn rename(&self, full_name: &str) -> Result<User, SessionError> {
        let user = self.current_user().ok_or(SessionError::NotLoggedIn)?;
        let updated = self
            .accounts
            .update_user(full_name.trim(), user.favorites_field())?;
        self.set_user(updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthResponse;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct FakeAccounts {
        user: Mutex<User>,
        updates: Mutex<Vec<(String, String)>>,
        reject_token: bool,
        reject_updates: bool,
    }

    impl AccountService for FakeAccounts {
        fn user(&self, _user_id: &str) -> Result<User, ApiError> {
            Ok(self.user.lock().clone())
        }

        fn auth_user(&self) -> Result<User, ApiError> {
            if self.reject_token {
                return Err(ApiError::Unauthorized);
            }
            Ok(self.user.lock().clone())
        }

        fn update_user(&self, full_name: &str, username: &str) -> Result<User, ApiError> {
            if self.reject_updates {
                return Err(ApiError::Status {
                    status: StatusCode::BAD_REQUEST,
                    body: "nope".into(),
                });
            }
            self.updates
                .lock()
                .push((full_name.to_string(), username.to_string()));
            let mut user = self.user.lock();
            user.full_name = full_name.to_string();
            user.username = Some(username.to_string());
            Ok(user.clone())
        }

        fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                user: self.user.lock().clone(),
                token: "tok-1".into(),
            })
        }

        fn signup(&self, _email: &str, _full_name: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            self.login("", "")
        }

        fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn fixture(accounts: FakeAccounts) -> (TempDir, Arc<storage::Store>, Arc<SessionToken>, Manager) {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            storage::Store::open(storage::Options {
                path: Some(dir.path().join("state.db")),
            })
            .unwrap(),
        );
        let token = Arc::new(SessionToken::default());
        let manager = Manager::new(store.clone(), Arc::new(accounts), token.clone());
        (dir, store, token, manager)
    }

    fn accounts_with(favorites: &str) -> FakeAccounts {
        FakeAccounts {
            user: Mutex::new(User {
                id: "u1".into(),
                full_name: "Eon".into(),
                email: "eon@example.com".into(),
                username: Some(favorites.into()),
                ..User::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn login_persists_and_shares_the_token() {
        let (_dir, store, token, manager) = fixture(accounts_with("[]"));
        assert!(!manager.is_logged_in());
        manager.login("eon@example.com", "pw").unwrap();
        assert!(manager.is_logged_in());
        assert_eq!(token.token().as_deref(), Some("tok-1"));
        assert_eq!(store.latest_session().unwrap().unwrap().token, "tok-1");
    }

    #[test]
    fn resume_restores_a_stored_session() {
        let (_dir, _store, token, manager) = fixture(accounts_with("[]"));
        manager.login("eon@example.com", "pw").unwrap();
        manager.logout().unwrap();
        assert!(token.token().is_none());
        assert!(manager.resume().unwrap().is_none());

        manager.login("eon@example.com", "pw").unwrap();
        *manager.active.write() = None;
        let user = manager.resume().unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(manager.is_logged_in());
    }

    #[test]
    fn expired_token_is_forgotten() {
        let accounts = FakeAccounts {
            reject_token: true,
            ..accounts_with("[]")
        };
        let (_dir, store, token, manager) = fixture(accounts);
        manager.login("eon@example.com", "pw").unwrap();
        *manager.active.write() = None;
        assert!(manager.resume().unwrap().is_none());
        assert!(token.token().is_none());
        assert!(store.latest_session().unwrap().is_none());
    }

    #[test]
    fn favorite_add_submits_sorted_list() {
        let (_dir, _store, _token, manager) = fixture(accounts_with(r#"["a","b"]"#));
        manager.login("eon@example.com", "pw").unwrap();
        let change = manager.toggle_favorite("c").unwrap();
        assert!(change.favorited);
        assert_eq!(change.favorites, vec!["a", "b", "c"]);
        assert!(manager.is_favorite("c"));
        assert_eq!(
            manager.current_user().unwrap().favorites_field(),
            r#"["a","b","c"]"#
        );
    }

    #[test]
    fn favorite_remove_keeps_order_and_may_empty_the_list() {
        let (_dir, _store, _token, manager) = fixture(accounts_with(r#"["c","a","b"]"#));
        manager.login("eon@example.com", "pw").unwrap();
        let change = manager.toggle_favorite("a").unwrap();
        assert!(!change.favorited);
        assert_eq!(change.favorites, vec!["c", "b"]);

        manager.toggle_favorite("c").unwrap();
        let change = manager.toggle_favorite("b").unwrap();
        assert!(change.favorites.is_empty());
        assert_eq!(manager.current_user().unwrap().favorites_field(), "[]");
    }

    #[test]
    fn failed_update_keeps_previous_favorites() {
        let accounts = FakeAccounts {
            reject_updates: true,
            ..accounts_with(r#"["a"]"#)
        };
        let (_dir, _store, _token, manager) = fixture(accounts);
        manager.login("eon@example.com", "pw").unwrap();
        assert!(matches!(
            manager.toggle_favorite("b"),
            Err(SessionError::Api(_))
        ));
        assert_eq!(manager.favorites().unwrap(), vec!["a"]);
    }

    #[test]
    fn favorite_toggle_requires_login() {
        let (_dir, _store, _token, manager) = fixture(accounts_with("[]"));
        assert!(matches!(
            manager.toggle_favorite("a"),
            Err(SessionError::NotLoggedIn)
        ));
    }

    #[test]
    fn rename_keeps_the_favorites_field() {
        let (_dir, _store, _token, manager) = fixture(accounts_with(r#"["x"]"#));
        manager.login("eon@example.com", "pw").unwrap();
        let user = manager.rename("  Dong  ").unwrap();
        assert_eq!(user.full_name, "Dong");
        assert_eq!(user.favorites_field(), r#"["x"]"#);
    }
}
