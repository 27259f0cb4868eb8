//! Stateless HTTP request builder and response parser for the movie API.
//!
//! # Design
//! `MovieClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round trip, keeping this layer
//! deterministic and free of I/O.
//!
//! Authenticated operations take the bearer token as an argument; when it is
//! `None` the request goes out without an `Authorization` header and the
//! server decides.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Credentials, Director, Genre, LoginResponse, Movie, Registration, UserPatch, UserRecord,
};

/// Synchronous, stateless client for the movie API.
#[derive(Debug, Clone)]
pub struct MovieClient {
    base_url: String,
}

impl MovieClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_register(&self, input: &Registration) -> Result<HttpRequest, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        self.json_request(HttpMethod::Post, "/users".to_string(), None, input)
    }

    pub fn build_login(&self, input: &Credentials) -> Result<HttpRequest, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        self.json_request(HttpMethod::Post, "/login".to_string(), None, input)
    }

    pub fn build_list_movies(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/movies".to_string(), token)
    }

    pub fn build_get_movie(&self, title: &str, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/movies/{}", segment(title)), token)
    }

    pub fn build_get_director(&self, name: &str, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/director/{}", segment(name)), token)
    }

    pub fn build_get_genre(&self, name: &str, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/genre/{}", segment(name)), token)
    }

    pub fn build_list_users(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/users".to_string(), token)
    }

    pub fn build_get_user(&self, username: &str, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, user_path(username), token)
    }

    pub fn build_get_user_favorites(&self, username: &str, token: Option<&str>) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!("{}/favorites", user_path(username)),
            token,
        )
    }

    pub fn build_add_favorite(
        &self,
        username: &str,
        movie_id: &str,
        token: Option<&str>,
    ) -> HttpRequest {
        self.request(HttpMethod::Post, favorite_path(username, movie_id), token)
    }

    pub fn build_remove_favorite(
        &self,
        username: &str,
        movie_id: &str,
        token: Option<&str>,
    ) -> HttpRequest {
        self.request(HttpMethod::Delete, favorite_path(username, movie_id), token)
    }

    pub fn build_edit_user(
        &self,
        username: &str,
        patch: &UserPatch,
        token: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::Validation("nothing to update".to_string()));
        }
        self.json_request(HttpMethod::Put, user_path(username), token, patch)
    }

    pub fn build_delete_user(&self, username: &str, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Delete, user_path(username), token)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<UserRecord, ApiError> {
        parse_json(response)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        parse_json(response)
    }

    pub fn parse_list_movies(&self, response: HttpResponse) -> Result<Vec<Movie>, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_movie(&self, response: HttpResponse) -> Result<Movie, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_director(&self, response: HttpResponse) -> Result<Director, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_genre(&self, response: HttpResponse) -> Result<Genre, ApiError> {
        parse_json(response)
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<UserRecord>, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<UserRecord, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_user_favorites(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        parse_json(response)
    }

    pub fn parse_add_favorite(&self, response: HttpResponse) -> Result<UserRecord, ApiError> {
        parse_json(response)
    }

    pub fn parse_remove_favorite(&self, response: HttpResponse) -> Result<UserRecord, ApiError> {
        parse_json(response)
    }

    pub fn parse_edit_user(&self, response: HttpResponse) -> Result<UserRecord, ApiError> {
        parse_json(response)
    }

    /// The server answers with a plain-text confirmation; only the status matters.
    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn request(&self, method: HttpMethod, path: String, token: Option<&str>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        token: Option<&str>,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path, token);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }
}

fn user_path(username: &str) -> String {
    format!("/users/{}", segment(username))
}

fn favorite_path(username: &str, movie_id: &str) -> String {
    format!("{}/movies/{}", user_path(username), segment(movie_id))
}

/// Percent-encode a single path segment, leaving RFC 3986 unreserved bytes as-is.
fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// An empty body decodes as `{}` so it never surfaces as `null`.
fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    let body = response.body.trim();
    let body = if body.is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}
