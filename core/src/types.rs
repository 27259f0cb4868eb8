//! Request and response schemas for the movie API.
//!
//! # Design
//! Every endpoint gets an explicit serde type so malformed payloads fail at
//! the decode boundary instead of travelling through the client as loose
//! JSON. Field names follow the server's wire format (`Username`, `_id`,
//! `favoriteMovies`, ...) through `#[serde(rename)]`; the Rust side uses
//! snake case.
//!
//! The server includes a `Password` hash in every user payload. `UserRecord`
//! has no such field, so the hash is discarded during deserialization and can
//! never reach the session cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A user as returned by login, registration and the user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Email", alias = "email", default)]
    pub email: String,
    #[serde(rename = "Birthday", alias = "birthday", default, with = "birthday")]
    pub birthday: Option<NaiveDate>,
    #[serde(rename = "favoriteMovies", alias = "FavoriteMovies", default)]
    pub favorite_movie_ids: Vec<String>,
}

impl UserRecord {
    pub fn has_favorite(&self, movie_id: &str) -> bool {
        self.favorite_movie_ids.iter().any(|id| id == movie_id)
    }

    /// Birthday formatted for display as `M/D/YYYY`.
    pub fn display_birthday(&self) -> Option<String> {
        self.birthday.map(|date| date.format("%-m/%-d/%Y").to_string())
    }
}

/// A catalog entry. Read-only from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Director")]
    pub director: Director,
    #[serde(rename = "Genre")]
    pub genre: Genre,
    #[serde(rename = "ImagePath", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(rename = "Featured", default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Director {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Bio", default)]
    pub bio: String,
    #[serde(rename = "Birth", default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
    #[serde(rename = "Death", default, skip_serializing_if = "Option::is_none")]
    pub death: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

/// Request payload for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "password")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username is required".to_string());
        }
        if self.password.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }
}

/// Response payload for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserRecord,
    pub token: String,
}

/// Request payload for `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "password")]
    pub password: String,
    #[serde(rename = "email")]
    pub email: String,
    #[serde(
        rename = "Birthday",
        default,
        with = "birthday",
        skip_serializing_if = "Option::is_none"
    )]
    pub birthday: Option<NaiveDate>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), String> {
        Credentials::new(self.username.as_str(), self.password.as_str()).validate()?;
        if !self.email.contains('@') {
            return Err("a valid email address is required".to_string());
        }
        Ok(())
    }
}

/// Request payload for `PUT /users/{username}`. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(rename = "Username", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "password", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "Birthday",
        default,
        with = "birthday",
        skip_serializing_if = "Option::is_none"
    )]
    pub birthday: Option<NaiveDate>,
    #[serde(rename = "favoriteMovies", skip_serializing_if = "Option::is_none")]
    pub favorite_movie_ids: Option<Vec<String>>,
}

impl UserPatch {
    /// A patch that only replaces the favorites list.
    pub fn favorites(ids: Vec<String>) -> Self {
        Self {
            favorite_movie_ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.birthday.is_none()
            && self.favorite_movie_ids.is_none()
    }
}

/// Birthdays are written as `YYYY-MM-DD`. The server stores them as full
/// timestamps, so reads also accept RFC 3339 and keep the date part.
mod birthday {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse(text).map(Some).map_err(de::Error::custom),
        }
    }

    fn parse(text: &str) -> Result<NaiveDate, String> {
        if let Ok(date) = NaiveDate::parse_from_str(text, FORMAT) {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(text)
            .map(|ts| ts.date_naive())
            .map_err(|_| format!("invalid birthday: {text}"))
    }
}
