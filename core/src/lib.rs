//! Client core for the myFlix movie catalog.
//!
//! # Overview
//! Authenticates users, lists movies and keeps a user's favorites list in
//! step with the server. The request/response layer builds `HttpRequest`
//! values and parses `HttpResponse` values without touching the network
//! (host-does-IO pattern); a `Transport` performs the round trip.
//!
//! # Design
//! - `MovieClient` is stateless: it holds only `base_url`. Each operation is
//!   split into `build_*` and `parse_*` so the I/O boundary is explicit.
//! - `MovieApi` reads the bearer token from the `SessionStore` at call time
//!   and collapses failures into `ServiceError`.
//! - `SessionStore` is an injectable handle over a `KeyValueStore`, owned by
//!   `AppContext` rather than reached through globals.
//! - `FavoritesSync` serializes favorites mutations per user.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod favorites;
pub mod http;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod views;

#[cfg(test)]
mod testing;

pub use api::MovieApi;
pub use app::AppContext;
pub use client::MovieClient;
pub use config::{ClientConfig, ConfigError, LoggingConfig};
pub use error::{ApiError, ServiceError, GENERIC_FAILURE};
pub use favorites::{FavoritesSync, Toggle};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Session, SessionStore};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Credentials, Director, Genre, LoginResponse, Movie, Registration, UserPatch, UserRecord,
};
pub use views::{
    favorites_of, LoginForm, MovieCard, MovieListView, Notice, Profile, ProfileView,
    RegistrationForm, Route, Screen,
};
