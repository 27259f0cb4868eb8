//! The client's authenticated session.
//!
//! # Design
//! `SessionStore` is an explicit, cloneable handle over a `KeyValueStore`.
//! It is created once by `AppContext` and handed to every component that
//! needs it instead of being reached through ambient global state. The token
//! lives under `"token"` and the cached user under `"user"` (as JSON).
//!
//! Token and user are written and removed together in one store batch and
//! read together in one snapshot, so a reader never pairs a new token with a
//! stale user. There is no in-memory copy: every read goes to the store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::store::{KeyValueStore, MemoryStore, StoreError};
use crate::types::UserRecord;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Snapshot of the stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserRecord>,
}

impl Session {
    /// A session is authenticated exactly when it carries a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(TOKEN_KEY)
    }

    pub fn user(&self) -> Result<Option<UserRecord>, StoreError> {
        self.store.get(USER_KEY)?.as_deref().map(decode_user).transpose()
    }

    pub fn session(&self) -> Result<Session, StoreError> {
        let mut values = self.store.get_many(&[TOKEN_KEY, USER_KEY])?.into_iter();
        let token = values.next().flatten();
        let user = values
            .next()
            .flatten()
            .as_deref()
            .map(decode_user)
            .transpose()?;
        Ok(Session { token, user })
    }

    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some())
    }

    pub fn set_session(&self, user: &UserRecord, token: &str) -> Result<(), StoreError> {
        let user_json = encode_user(user)?;
        self.store
            .set_many(&[(TOKEN_KEY, token), (USER_KEY, user_json.as_str())])?;
        info!(username = %user.username, "session started");
        Ok(())
    }

    /// Replace the cached user, leaving the token as it is, but only while
    /// `token` is still the stored token. Returns `false` and writes nothing
    /// when the session was cleared or replaced since the caller read it.
    pub fn update_user(&self, token: &str, user: &UserRecord) -> Result<bool, StoreError> {
        let user_json = encode_user(user)?;
        if !self
            .store
            .set_many_if(TOKEN_KEY, token, &[(USER_KEY, user_json.as_str())])?
        {
            warn!(username = %user.username, "session changed, discarding fetched user");
            return Ok(false);
        }
        debug!(
            username = %user.username,
            favorites = user.favorite_movie_ids.len(),
            "cached user replaced"
        );
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_many(&[TOKEN_KEY, USER_KEY])?;
        info!("session cleared");
        Ok(())
    }
}

fn encode_user(user: &UserRecord) -> Result<String, StoreError> {
    serde_json::to_string(user).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_user(raw: &str) -> Result<UserRecord, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(format!("cached user: {e}")))
}
