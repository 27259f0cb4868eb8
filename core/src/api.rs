//! The application-facing API client.
//!
//! # Design
//! `MovieApi` pairs the stateless `MovieClient` with a `Transport` and the
//! `SessionStore`. For every operation it reads the token from the session
//! at call time, builds the request, executes it and parses the response.
//! It holds no state of its own beyond those handles.
//!
//! Failures are logged here, with the status and body the server sent, and
//! then collapsed into `ServiceError`. Callers get a message they can show;
//! the diagnostics stay in the log.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::client::MovieClient;
use crate::error::{ApiError, ServiceError};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::SessionStore;
use crate::transport::Transport;
use crate::types::{
    Credentials, Director, Genre, LoginResponse, Movie, Registration, UserPatch, UserRecord,
};

#[derive(Clone)]
pub struct MovieApi {
    client: MovieClient,
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl std::fmt::Debug for MovieApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieApi")
            .field("base_url", &self.client.base_url())
            .finish_non_exhaustive()
    }
}

impl MovieApi {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self {
            client: MovieClient::new(base_url),
            transport,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn register(&self, input: &Registration) -> Result<UserRecord, ServiceError> {
        let request = self.client.build_register(input);
        self.run("register", request, |c, r| c.parse_register(r))
    }

    /// Authenticate. The caller decides whether to start a session with the result.
    pub fn login(&self, input: &Credentials) -> Result<LoginResponse, ServiceError> {
        let request = self.client.build_login(input);
        self.run("login", request, |c, r| c.parse_login(r))
    }

    pub fn list_movies(&self) -> Result<Vec<Movie>, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_list_movies(token.as_deref());
        self.run("list_movies", Ok(request), |c, r| c.parse_list_movies(r))
    }

    pub fn get_movie(&self, title: &str) -> Result<Movie, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_get_movie(title, token.as_deref());
        self.run("get_movie", Ok(request), |c, r| c.parse_get_movie(r))
    }

    pub fn get_director(&self, name: &str) -> Result<Director, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_get_director(name, token.as_deref());
        self.run("get_director", Ok(request), |c, r| c.parse_get_director(r))
    }

    pub fn get_genre(&self, name: &str) -> Result<Genre, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_get_genre(name, token.as_deref());
        self.run("get_genre", Ok(request), |c, r| c.parse_get_genre(r))
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_list_users(token.as_deref());
        self.run("list_users", Ok(request), |c, r| c.parse_list_users(r))
    }

    pub fn get_user(&self, username: &str) -> Result<UserRecord, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_get_user(username, token.as_deref());
        self.run("get_user", Ok(request), |c, r| c.parse_get_user(r))
    }

    pub fn get_user_favorites(&self, username: &str) -> Result<Vec<String>, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_get_user_favorites(username, token.as_deref());
        self.run("get_user_favorites", Ok(request), |c, r| {
            c.parse_get_user_favorites(r)
        })
    }

    pub fn add_favorite(&self, username: &str, movie_id: &str) -> Result<UserRecord, ServiceError> {
        let token = self.token()?;
        let request = self
            .client
            .build_add_favorite(username, movie_id, token.as_deref());
        self.run("add_favorite", Ok(request), |c, r| c.parse_add_favorite(r))
    }

    pub fn remove_favorite(
        &self,
        username: &str,
        movie_id: &str,
    ) -> Result<UserRecord, ServiceError> {
        let token = self.token()?;
        let request = self
            .client
            .build_remove_favorite(username, movie_id, token.as_deref());
        self.run("remove_favorite", Ok(request), |c, r| {
            c.parse_remove_favorite(r)
        })
    }

    pub fn edit_user(&self, username: &str, patch: &UserPatch) -> Result<UserRecord, ServiceError> {
        let token = self.token()?;
        let request = self.client.build_edit_user(username, patch, token.as_deref());
        self.run("edit_user", request, |c, r| c.parse_edit_user(r))
    }

    pub fn delete_user(&self, username: &str) -> Result<(), ServiceError> {
        let token = self.token()?;
        let request = self.client.build_delete_user(username, token.as_deref());
        self.run("delete_user", Ok(request), |c, r| c.parse_delete_user(r))
    }

    fn token(&self) -> Result<Option<String>, ServiceError> {
        Ok(self.session.token()?)
    }

    fn run<T>(
        &self,
        op: &'static str,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&MovieClient, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ServiceError> {
        let request = request.map_err(|e| {
            warn!(op, error = %e, "request rejected before sending");
            ServiceError::from(e)
        })?;
        let response = self.transport.execute(&request).map_err(|e| {
            error!(op, method = %request.method, path = %request.path, error = %e, "transport failure");
            ServiceError::from(e)
        })?;
        let status = response.status;
        let body = response.body.clone();
        let parsed = parse(&self.client, response).map_err(|e| {
            match &e {
                ApiError::DeserializationError(reason) => {
                    error!(op, status, %reason, %body, "malformed response body")
                }
                _ => error!(op, status, %body, "request failed"),
            }
            ServiceError::from(e)
        })?;
        debug!(op, status, "request succeeded");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;

    const ALICE: &str =
        r#"{"Username":"alice","Password":"hash","Email":"a@example.com","favoriteMovies":[]}"#;

    fn api(transport: &Arc<StubTransport>) -> MovieApi {
        MovieApi::new(
            "http://api.test",
            transport.clone(),
            SessionStore::in_memory(),
        )
    }

    #[test]
    fn authenticated_calls_read_token_at_call_time() {
        let transport = StubTransport::new();
        let api = api(&transport);
        transport.push(200, "[]");
        transport.push(200, "[]");

        api.list_movies().unwrap();
        let user: UserRecord = serde_json::from_str(ALICE).unwrap();
        api.session().set_session(&user, "abc").unwrap();
        api.list_movies().unwrap();

        let sent = transport.requests();
        assert!(sent[0].header("authorization").is_none());
        assert_eq!(sent[1].header("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn server_error_collapses_to_generic_message() {
        let transport = StubTransport::new();
        transport.push(500, "database exploded");
        let err = api(&transport).list_movies().unwrap_err();
        assert_eq!(err, ServiceError::Request);
        assert_eq!(err.message(), crate::error::GENERIC_FAILURE);
    }

    #[test]
    fn transport_error_collapses_to_generic_message() {
        let transport = StubTransport::new();
        transport.fail("connection refused");
        let err = api(&transport).get_user("alice").unwrap_err();
        assert_eq!(err, ServiceError::Request);
    }

    #[test]
    fn malformed_body_fails_fast() {
        let transport = StubTransport::new();
        transport.push(200, r#"{"unexpected": true}"#);
        let err = api(&transport).get_user("alice").unwrap_err();
        assert_eq!(err, ServiceError::UnexpectedResponse);
    }

    #[test]
    fn invalid_input_is_not_sent() {
        let transport = StubTransport::new();
        let err = api(&transport)
            .login(&Credentials::new("", "pw"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn login_does_not_touch_session() {
        let transport = StubTransport::new();
        transport.push(200, &format!(r#"{{"user":{ALICE},"token":"abc"}}"#));
        let api = api(&transport);
        let login = api.login(&Credentials::new("alice", "pw")).unwrap();
        assert_eq!(login.token, "abc");
        assert_eq!(api.session().token().unwrap(), None);
    }
}
