//! Favorites synchronization.
//!
//! # Design
//! `UserRecord::favorite_movie_ids` in the session cache is the client's
//! only copy of the favorites list. A toggle reads membership from the
//! cache, calls the dedicated add or remove endpoint, and on success
//! replaces the cached user with the record the server returned. On failure
//! the cache is left alone. The write is conditional on the session token
//! the toggle started from: if the user logged out or another user logged
//! in meanwhile, the server's record is dropped with
//! `ServiceError::SessionChanged`.
//!
//! Toggles for the same user are serialized by a per-username guard: a
//! second toggle waits for the first to finish and then reads the cache the
//! first one wrote, so two quick taps add and then remove instead of racing.
//! A guard is forgotten once nobody holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::api::MovieApi;
use crate::error::ServiceError;
use crate::session::Session;
use crate::types::{UserPatch, UserRecord};

/// Result of a toggle: the user as the server now has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub user: UserRecord,
    pub is_favorite: bool,
}

pub struct FavoritesSync {
    api: MovieApi,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for FavoritesSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesSync").finish_non_exhaustive()
    }
}

impl FavoritesSync {
    pub fn new(api: MovieApi) -> Self {
        Self {
            api,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Membership according to the cached user.
    pub fn is_favorite(&self, movie_id: &str) -> Result<bool, ServiceError> {
        Ok(self.logged_in()?.1.has_favorite(movie_id))
    }

    /// Add `movie_id` to the logged-in user's favorites if absent, remove it if present.
    pub fn toggle(&self, movie_id: &str) -> Result<Toggle, ServiceError> {
        let username = self.logged_in()?.1.username;
        self.exclusive(&username, || -> Result<Toggle, ServiceError> {
            // Re-read under the guard: a toggle that just finished may have changed it.
            let (token, user) = self.logged_in()?;
            let was_favorite = user.has_favorite(movie_id);
            debug!(username = %user.username, movie_id, was_favorite, "toggling favorite");

            let result = if was_favorite {
                self.api.remove_favorite(&user.username, movie_id)
            } else {
                self.api.add_favorite(&user.username, movie_id)
            };
            let updated = self.commit(&token, &user, movie_id, result)?;
            let is_favorite = updated.has_favorite(movie_id);
            info!(username = %updated.username, movie_id, is_favorite, "favorites updated");
            Ok(Toggle {
                user: updated,
                is_favorite,
            })
        })
    }

    /// Remove `movie_id` from the logged-in user's favorites. Returns `None`
    /// without contacting the server when the cached user does not have it.
    pub fn remove(&self, movie_id: &str) -> Result<Option<Toggle>, ServiceError> {
        let username = self.logged_in()?.1.username;
        self.exclusive(&username, || -> Result<Option<Toggle>, ServiceError> {
            let (token, user) = self.logged_in()?;
            if !user.has_favorite(movie_id) {
                debug!(username = %user.username, movie_id, "not a favorite, nothing to remove");
                return Ok(None);
            }
            let result = self.api.remove_favorite(&user.username, movie_id);
            let updated = self.commit(&token, &user, movie_id, result)?;
            info!(username = %updated.username, movie_id, "favorite removed");
            Ok(Some(Toggle {
                is_favorite: updated.has_favorite(movie_id),
                user: updated,
            }))
        })
    }

    /// Remove a favorite by submitting the whole filtered list as a user edit.
    #[deprecated(note = "use `remove`, which calls the dedicated favorites endpoint")]
    pub fn remove_via_edit(&self, movie_id: &str) -> Result<UserRecord, ServiceError> {
        let username = self.logged_in()?.1.username;
        self.exclusive(&username, || -> Result<UserRecord, ServiceError> {
            let (token, user) = self.logged_in()?;
            let remaining: Vec<String> = user
                .favorite_movie_ids
                .iter()
                .filter(|id| id.as_str() != movie_id)
                .cloned()
                .collect();
            let result = self
                .api
                .edit_user(&user.username, &UserPatch::favorites(remaining));
            self.commit(&token, &user, movie_id, result)
        })
    }

    /// Cache the server's record if the session is still the one the
    /// mutation started from.
    fn commit(
        &self,
        token: &str,
        user: &UserRecord,
        movie_id: &str,
        result: Result<UserRecord, ServiceError>,
    ) -> Result<UserRecord, ServiceError> {
        let updated = result.map_err(|e| {
            warn!(username = %user.username, movie_id, "favorites update failed, cache unchanged");
            e
        })?;
        if !self.api.session().update_user(token, &updated)? {
            return Err(ServiceError::SessionChanged);
        }
        Ok(updated)
    }

    fn logged_in(&self) -> Result<(String, UserRecord), ServiceError> {
        match self.api.session().session()? {
            Session {
                token: Some(token),
                user: Some(user),
            } => Ok((token, user)),
            _ => Err(ServiceError::NotLoggedIn),
        }
    }

    /// Run `f` while holding `username`'s guard. The guard's map entry is
    /// dropped once no other caller holds or waits on it.
    fn exclusive<T>(&self, username: &str, f: impl FnOnce() -> T) -> T {
        let guard = self.guard_for(username);
        let result = {
            let _held = guard.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(guard);
        if in_flight
            .get(username)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            in_flight.remove(username);
        }
        result
    }

    fn guard_for(&self, username: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
