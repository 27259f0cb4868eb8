//! View controllers: the login and registration dialogs, the movie grid and
//! the profile page, independent of any UI toolkit.
//!
//! Each controller turns a user action into `MovieApi` / `FavoritesSync`
//! calls and returns either a view model, a `Notice` to show, or the error.
//! Auth-gated views read the session once when loaded and answer with
//! `Screen::Redirect(Route::Welcome)` when there is no token.

use std::fmt;

use tracing::debug;

use crate::app::AppContext;
use crate::error::ServiceError;
use crate::session::Session;
use crate::types::{Credentials, Movie, Registration, UserPatch, UserRecord};

/// Where the UI should navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Welcome,
    Movies,
    Profile,
}

/// What an auth-gated view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen<T> {
    Ready(T),
    Redirect(Route),
}

/// A short message for the user, such as a snackbar or status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(String);

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// `"<context>: <error message>"`.
    pub fn failure(context: &str, err: &ServiceError) -> Self {
        Self(format!("{context}: {}", err.message()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Movies whose id is in `favorite_ids`, in catalog order.
pub fn favorites_of(movies: &[Movie], favorite_ids: &[String]) -> Vec<Movie> {
    movies
        .iter()
        .filter(|movie| favorite_ids.contains(&movie.id))
        .cloned()
        .collect()
}

pub struct LoginForm {
    ctx: AppContext,
}

impl LoginForm {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Log in and start the session. On success the UI moves to `Route::Movies`.
    pub fn submit(&self, credentials: &Credentials) -> Result<Notice, ServiceError> {
        let login = self.ctx.api().login(credentials)?;
        self.ctx.session().set_session(&login.user, &login.token)?;
        Ok(Notice::new("Login successful"))
    }
}

pub struct RegistrationForm {
    ctx: AppContext,
}

impl RegistrationForm {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Create the account. Does not log in.
    pub fn submit(&self, registration: &Registration) -> Result<Notice, ServiceError> {
        let user = self.ctx.api().register(registration)?;
        debug!(username = %user.username, "registered");
        Ok(Notice::new("Registration successful"))
    }
}

/// A movie together with its favorites membership for the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieCard {
    pub movie: Movie,
    pub is_favorite: bool,
}

pub struct MovieListView {
    ctx: AppContext,
    movies: Vec<Movie>,
}

impl MovieListView {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            movies: Vec::new(),
        }
    }

    /// Fetch the catalog. A failed fetch keeps the previously loaded list.
    pub fn load(&mut self) -> Result<Screen<Vec<MovieCard>>, ServiceError> {
        let session = self.ctx.session().session()?;
        if !session.is_authenticated() {
            return Ok(Screen::Redirect(Route::Welcome));
        }
        self.movies = self.ctx.api().list_movies()?;
        Ok(Screen::Ready(self.cards_for(session.user.as_ref())))
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Pair every loaded movie with membership from the cached user.
    pub fn cards(&self) -> Result<Vec<MovieCard>, ServiceError> {
        let user = self.ctx.session().user()?;
        Ok(self.cards_for(user.as_ref()))
    }

    fn cards_for(&self, user: Option<&UserRecord>) -> Vec<MovieCard> {
        self.movies
            .iter()
            .map(|movie| MovieCard {
                is_favorite: user.is_some_and(|u| u.has_favorite(&movie.id)),
                movie: movie.clone(),
            })
            .collect()
    }

    pub fn toggle_favorite(&self, movie_id: &str) -> Result<Notice, ServiceError> {
        let toggle = self.ctx.favorites().toggle(movie_id)?;
        Ok(if toggle.is_favorite {
            Notice::new("Movie added to favorites")
        } else {
            Notice::new("Movie removed from favorites")
        })
    }
}

/// The profile page's view model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user: UserRecord,
    /// `M/D/YYYY`, when the user has a birthday on record.
    pub birthday: Option<String>,
    pub favorites: Vec<Movie>,
}

pub struct ProfileView {
    ctx: AppContext,
    profile: Option<Profile>,
}

impl ProfileView {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, profile: None }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Fetch the user, refresh the cache, and project the favorites list.
    pub fn load(&mut self) -> Result<Screen<Profile>, ServiceError> {
        let (token, cached) = match self.ctx.session().session()? {
            Session {
                token: Some(token),
                user: Some(user),
            } => (token, user),
            _ => return Ok(Screen::Redirect(Route::Welcome)),
        };

        let user = self.ctx.api().get_user(&cached.username)?;
        if !self.ctx.session().update_user(&token, &user)? {
            return Err(ServiceError::SessionChanged);
        }
        let movies = self.ctx.api().list_movies()?;

        let profile = Profile {
            birthday: user.display_birthday(),
            favorites: favorites_of(&movies, &user.favorite_movie_ids),
            user,
        };
        self.profile = Some(profile.clone());
        Ok(Screen::Ready(profile))
    }

    /// Apply `patch`, then re-fetch and re-cache the user.
    pub fn update(&mut self, patch: &UserPatch) -> Result<Notice, ServiceError> {
        let profile = self.profile.as_mut().ok_or(ServiceError::NotLoggedIn)?;
        let token = self
            .ctx
            .session()
            .token()?
            .ok_or(ServiceError::NotLoggedIn)?;
        let api = self.ctx.api();
        let edited = api.edit_user(&profile.user.username, patch)?;
        let user = api.get_user(&edited.username)?;
        if !self.ctx.session().update_user(&token, &user)? {
            return Err(ServiceError::SessionChanged);
        }

        profile.birthday = user.display_birthday();
        profile.user = user;
        Ok(Notice::new("Update successful"))
    }

    pub fn remove_favorite(&mut self, movie_id: &str) -> Result<Notice, ServiceError> {
        let profile = self.profile.as_mut().ok_or(ServiceError::NotLoggedIn)?;
        let Some(toggle) = self.ctx.favorites().remove(movie_id)? else {
            return Ok(Notice::new("Movie is not in favorites"));
        };
        profile
            .favorites
            .retain(|movie| toggle.user.has_favorite(&movie.id));
        profile.user = toggle.user;
        Ok(Notice::new("Movie removed from favorites"))
    }

    /// Delete the account on the server and end the session.
    pub fn delete_account(&mut self) -> Result<Notice, ServiceError> {
        let username = match &self.profile {
            Some(profile) => profile.user.username.clone(),
            None => return Err(ServiceError::NotLoggedIn),
        };
        self.ctx.api().delete_user(&username)?;
        self.ctx.logout()?;
        self.profile = None;
        Ok(Notice::new("Account deleted"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::GENERIC_FAILURE;
    use crate::session::SessionStore;
    use crate::testing::{CountingStore, HookTransport, StubTransport};

    fn movies_json() -> String {
        serde_json::json!([
            {"_id": "m1", "Title": "Alien", "Genre": {"Name": "Horror"}, "Director": {"Name": "Ridley Scott"}},
            {"_id": "m2", "Title": "Heat", "Genre": {"Name": "Crime"}, "Director": {"Name": "Michael Mann"}},
            {"_id": "m42", "Title": "Arrival", "Genre": {"Name": "Sci-Fi"}, "Director": {"Name": "Denis Villeneuve"}}
        ])
        .to_string()
    }

    fn user_json(favorites: &[&str]) -> String {
        serde_json::json!({
            "Username": "alice",
            "Password": "$2b$10$hash",
            "Email": "alice@example.com",
            "Birthday": "1990-04-01T00:00:00.000Z",
            "favoriteMovies": favorites,
        })
        .to_string()
    }

    fn context(transport: &Arc<StubTransport>) -> AppContext {
        AppContext::new("http://api.test", transport.clone(), SessionStore::in_memory())
    }

    fn logged_in(transport: &Arc<StubTransport>, favorites: &[&str]) -> AppContext {
        let ctx = context(transport);
        let user: UserRecord = serde_json::from_str(&user_json(favorites)).unwrap();
        ctx.session().set_session(&user, "abc").unwrap();
        ctx
    }

    #[test]
    fn login_scenario_starts_session() {
        let transport = StubTransport::new();
        let ctx = context(&transport);
        transport.push(
            200,
            r#"{"user":{"Username":"alice","favoriteMovies":[]},"token":"abc"}"#,
        );

        let notice = LoginForm::new(ctx.clone())
            .submit(&Credentials::new("alice", "pw"))
            .unwrap();
        assert_eq!(notice.message(), "Login successful");
        assert_eq!(ctx.session().token().unwrap().as_deref(), Some("abc"));
        let user = ctx.session().user().unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.favorite_movie_ids.is_empty());
    }

    #[test]
    fn failed_login_creates_no_session() {
        let transport = StubTransport::new();
        let ctx = context(&transport);
        transport.push(400, "Incorrect username or password.");

        let err = LoginForm::new(ctx.clone())
            .submit(&Credentials::new("alice", "wrong"))
            .unwrap_err();
        assert_eq!(
            Notice::failure("Login failed", &err).message(),
            format!("Login failed: {GENERIC_FAILURE}")
        );
        assert!(!ctx.is_logged_in().unwrap());
    }

    #[test]
    fn duplicate_registration_reports_error_without_session() {
        let transport = StubTransport::new();
        let ctx = context(&transport);
        transport.push(400, "alice already exists");

        let registration = Registration {
            username: "alice".to_string(),
            password: "pw".to_string(),
            email: "alice@example.com".to_string(),
            birthday: None,
        };
        let err = RegistrationForm::new(ctx.clone())
            .submit(&registration)
            .unwrap_err();
        assert_eq!(err.message(), GENERIC_FAILURE);
        assert_eq!(ctx.session().session().unwrap().token, None);
        assert_eq!(ctx.session().user().unwrap(), None);
    }

    #[test]
    fn movie_list_redirects_without_token() {
        let transport = StubTransport::new();
        let mut view = MovieListView::new(context(&transport));
        assert_eq!(view.load().unwrap(), Screen::Redirect(Route::Welcome));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn movie_list_marks_favorites() {
        let transport = StubTransport::new();
        let mut view = MovieListView::new(logged_in(&transport, &["m2"]));
        transport.push(200, &movies_json());

        let Screen::Ready(cards) = view.load().unwrap() else {
            panic!("expected cards");
        };
        let flags: Vec<(&str, bool)> = cards
            .iter()
            .map(|c| (c.movie.id.as_str(), c.is_favorite))
            .collect();
        assert_eq!(flags, vec![("m1", false), ("m2", true), ("m42", false)]);
    }

    #[test]
    fn movie_list_keeps_cached_movies_on_server_error() {
        let transport = StubTransport::new();
        let mut view = MovieListView::new(logged_in(&transport, &[]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        transport.push(500, "internal error");
        let err = view.load().unwrap_err();
        assert_eq!(err.message(), GENERIC_FAILURE);
        assert_eq!(view.movies().len(), 3);
    }

    #[test]
    fn toggle_updates_cards() {
        let transport = StubTransport::new();
        let mut view = MovieListView::new(logged_in(&transport, &[]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        transport.push(200, &user_json(&["m42"]));
        let notice = view.toggle_favorite("m42").unwrap();
        assert_eq!(notice.message(), "Movie added to favorites");
        let favorite: Vec<String> = view
            .cards()
            .unwrap()
            .into_iter()
            .filter(|c| c.is_favorite)
            .map(|c| c.movie.id)
            .collect();
        assert_eq!(favorite, vec!["m42"]);

        transport.push(200, &user_json(&[]));
        let notice = view.toggle_favorite("m42").unwrap();
        assert_eq!(notice.message(), "Movie removed from favorites");
        assert!(view.cards().unwrap().iter().all(|c| !c.is_favorite));
    }

    #[test]
    fn profile_projects_favorites_and_formats_birthday() {
        let transport = StubTransport::new();
        let ctx = logged_in(&transport, &[]);
        let mut view = ProfileView::new(ctx.clone());
        transport.push(200, &user_json(&["m42", "m1"]));
        transport.push(200, &movies_json());

        let Screen::Ready(profile) = view.load().unwrap() else {
            panic!("expected profile");
        };
        assert_eq!(profile.birthday.as_deref(), Some("4/1/1990"));
        let ids: Vec<&str> = profile.favorites.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m42"]);
        // The fresh record replaced the cache.
        assert_eq!(
            ctx.session().user().unwrap().unwrap().favorite_movie_ids,
            vec!["m42", "m1"]
        );
    }

    #[test]
    fn profile_redirects_without_session() {
        let transport = StubTransport::new();
        let mut view = ProfileView::new(context(&transport));
        assert_eq!(view.load().unwrap(), Screen::Redirect(Route::Welcome));
    }

    #[test]
    fn profile_remove_favorite_reprojects() {
        let transport = StubTransport::new();
        let mut view = ProfileView::new(logged_in(&transport, &["m1", "m42"]));
        transport.push(200, &user_json(&["m1", "m42"]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        transport.push(200, &user_json(&["m1"]));
        let notice = view.remove_favorite("m42").unwrap();
        assert_eq!(notice.message(), "Movie removed from favorites");
        let profile = view.profile().unwrap();
        assert_eq!(profile.favorites.len(), 1);
        assert_eq!(profile.favorites[0].id, "m1");
    }

    #[test]
    fn profile_update_refetches_user() {
        let transport = StubTransport::new();
        let ctx = logged_in(&transport, &[]);
        let mut view = ProfileView::new(ctx.clone());
        transport.push(200, &user_json(&[]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        let updated = r#"{"Username":"alice","Email":"new@example.com","favoriteMovies":[]}"#;
        transport.push(200, updated);
        transport.push(200, updated);
        let patch = UserPatch {
            email: Some("new@example.com".to_string()),
            ..UserPatch::default()
        };
        assert_eq!(view.update(&patch).unwrap().message(), "Update successful");
        assert_eq!(view.profile().unwrap().user.email, "new@example.com");
        assert_eq!(ctx.session().user().unwrap().unwrap().email, "new@example.com");
    }

    #[test]
    fn delete_account_ends_session() {
        let transport = StubTransport::new();
        let ctx = logged_in(&transport, &[]);
        let mut view = ProfileView::new(ctx.clone());
        transport.push(200, &user_json(&[]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        transport.push(200, "alice was deleted.");
        view.delete_account().unwrap();
        assert!(!ctx.is_logged_in().unwrap());
        assert!(view.profile().is_none());
    }

    #[test]
    fn favorites_view_is_exact_projection() {
        let movies: Vec<Movie> = serde_json::from_str(&movies_json()).unwrap();
        let ids = vec!["m42".to_string(), "missing".to_string()];
        let projected = favorites_of(&movies, &ids);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].title, "Arrival");
        assert_eq!(favorites_of(&movies, &ids), projected);
    }

    #[test]
    fn movie_list_load_reads_session_once() {
        let store = Arc::new(CountingStore::default());
        let transport = StubTransport::new();
        let ctx = AppContext::new("http://api.test", transport.clone(), SessionStore::new(store.clone()));
        let user: UserRecord = serde_json::from_str(&user_json(&["m2"])).unwrap();
        ctx.session().set_session(&user, "abc").unwrap();
        transport.push(200, &movies_json());
        store.reset();

        let mut view = MovieListView::new(ctx);
        let Screen::Ready(cards) = view.load().unwrap() else {
            panic!("expected cards");
        };
        assert!(cards.iter().any(|c| c.movie.id == "m2" && c.is_favorite));
        // One snapshot for the view, one for the request's bearer token.
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn profile_remove_skips_movie_removed_elsewhere() {
        let transport = StubTransport::new();
        let ctx = logged_in(&transport, &["m1", "m42"]);
        let mut view = ProfileView::new(ctx.clone());
        transport.push(200, &user_json(&["m1", "m42"]));
        transport.push(200, &movies_json());
        view.load().unwrap();

        // Another screen's toggle took m42 out after the profile loaded.
        let user: UserRecord = serde_json::from_str(&user_json(&["m1"])).unwrap();
        assert!(ctx.session().update_user("abc", &user).unwrap());

        let notice = view.remove_favorite("m42").unwrap();
        assert_eq!(notice.message(), "Movie is not in favorites");
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(ctx.session().user().unwrap().unwrap().favorite_movie_ids, vec!["m1"]);
    }

    #[test]
    fn profile_load_after_logout_does_not_recache_user() {
        let session = SessionStore::in_memory();
        let user: UserRecord = serde_json::from_str(&user_json(&[])).unwrap();
        session.set_session(&user, "abc").unwrap();
        let stub = StubTransport::new();
        stub.push(200, &user_json(&["m42"]));
        let shared = session.clone();
        let transport = Arc::new(HookTransport::new(stub, move || shared.clear().unwrap()));
        let ctx = AppContext::new("http://api.test", transport, session);

        let err = ProfileView::new(ctx.clone()).load().unwrap_err();
        assert_eq!(err, ServiceError::SessionChanged);
        assert_eq!(ctx.session().token().unwrap(), None);
        assert_eq!(ctx.session().user().unwrap(), None);
    }
}
