//! Application context: the single owner of the session lifecycle.
//!
//! `AppContext` is built once at process start and cloned into every view.
//! It wires the session store, transport, API client and favorites
//! synchronizer together so no component reaches for global state.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::MovieApi;
use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::favorites::FavoritesSync;
use crate::session::SessionStore;
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::transport::{Transport, UreqTransport};

#[derive(Debug, Clone)]
pub struct AppContext {
    api: MovieApi,
    favorites: Arc<FavoritesSync>,
}

impl AppContext {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        let api = MovieApi::new(base_url, transport, session);
        let favorites = Arc::new(FavoritesSync::new(api.clone()));
        Self { api, favorites }
    }

    /// Build the production context: `ureq` transport, file-backed session
    /// when a path is configured, in-memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = match &config.session.path {
            Some(path) => Arc::new(FileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        let transport = Arc::new(UreqTransport::new(Duration::from_secs(
            config.api.timeout_secs,
        )));
        info!(base_url = %config.api.base_url, "client context created");
        Self::new(&config.api.base_url, transport, SessionStore::new(store))
    }

    pub fn api(&self) -> &MovieApi {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    pub fn favorites(&self) -> &FavoritesSync {
        &self.favorites
    }

    pub fn is_logged_in(&self) -> Result<bool, ServiceError> {
        Ok(self.session().is_authenticated()?)
    }

    /// Tear down the session. Safe to call when already logged out.
    pub fn logout(&self) -> Result<(), ServiceError> {
        self.session().clear()?;
        Ok(())
    }
}
