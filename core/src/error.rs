//! Error types for the movie API client.
//!
//! # Design
//! Two layers. `ApiError` is the diagnostic taxonomy produced by
//! `MovieClient` and the transport: it keeps the raw status and body so
//! failures can be logged precisely. `ServiceError` is what callers of
//! `MovieApi`, `FavoritesSync` and the views receive: transport and server
//! failures collapse into one opaque `Request` variant whose message is safe
//! to show to a user.

use thiserror::Error;

use crate::store::StoreError;

/// Message shown for every transport or server failure.
pub const GENERIC_FAILURE: &str = "Something bad happened; please try again later.";

/// Errors returned by `MovieClient` build and parse methods and by transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (network unreachable, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request was rejected locally before being sent.
    #[error("{0}")]
    Validation(String),
}

/// Errors surfaced to application code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Transport failure or non-2xx response. Details are logged, not exposed.
    #[error("{}", GENERIC_FAILURE)]
    Request,

    /// A 2xx response whose body did not match the endpoint's schema.
    #[error("The server sent an unexpected response.")]
    UnexpectedResponse,

    /// Client-side validation failed; nothing was sent.
    #[error("{0}")]
    Invalid(String),

    /// The operation needs a logged-in user and the session has none.
    #[error("User not logged in")]
    NotLoggedIn,

    /// The session was cleared or replaced while the request was in flight;
    /// the server's answer was not cached.
    #[error("Your session changed; please try again.")]
    SessionChanged,

    /// The local session store could not be read or written.
    #[error("could not access the local session: {0}")]
    Storage(String),
}

impl ServiceError {
    /// The user-facing message for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound | ApiError::HttpError { .. } | ApiError::Transport(_) => {
                ServiceError::Request
            }
            ApiError::DeserializationError(_) => ServiceError::UnexpectedResponse,
            ApiError::SerializationError(msg) | ApiError::Validation(msg) => {
                ServiceError::Invalid(msg)
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Storage(err.to_string())
    }
}
