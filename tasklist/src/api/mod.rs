//! REST API abstraction for the tasklist client.
//!
//! Defines the [`Api`] trait that the stores talk to. Implementations:
//! - [`http::HttpApi`]: reqwest client against a real server
//! - [`memory::InMemoryApi`]: in-process fake server for testing
//!
//! Implementations authorize requests from a shared [`Session`](crate::session::Session);
//! the trait itself is token-agnostic.

pub mod http;
pub mod memory;

use std::fmt;

use tasklist_proto::auth::{Credentials, NewUser, TokenBody, User};
use tasklist_proto::codec::CodecError;
use tasklist_proto::{ApiErrorBody, List, ListBody, ListId, Task, TaskBody, TaskId, TaskPatch};

/// HTTP method of an API call, used for logging and request recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Errors that can occur during an API call.
///
/// The `Display` output is the human-readable message callers show to the
/// user: the server's own message when it sent one, a generic one otherwise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credentials or the missing token (401/403).
    #[error("{message}")]
    Unauthorized {
        /// HTTP status code, 401 or 403.
        status: u16,
        /// Message to show.
        message: String,
    },

    /// Any other non-2xx response.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message to show.
        message: String,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("network error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The configured base URL cannot address API endpoints.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Builds the error for a non-2xx response.
    ///
    /// Uses the server's message when the body carries one, else a generic
    /// `request failed with status N`.
    #[must_use]
    pub fn from_status(status: u16, body: Option<&ApiErrorBody>) -> Self {
        let message = body
            .and_then(ApiErrorBody::message)
            .map_or_else(|| format!("request failed with status {status}"), str::to_string);
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// The HTTP status behind this error, if there was a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Async client for the tasklist REST API.
///
/// Each method maps to exactly one HTTP request. Implementations attach the
/// session's bearer token when one is present and send the request
/// regardless; the server is the authority on whether a call is allowed.
pub trait Api: Send + Sync {
    /// `POST /users`: create an account and return its token.
    fn sign_up(
        &self,
        user: &NewUser,
    ) -> impl std::future::Future<Output = Result<TokenBody, ApiError>> + Send;

    /// `POST /signin`: exchange credentials for a token.
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<TokenBody, ApiError>> + Send;

    /// `GET /users`: the signed-in user.
    fn user(&self) -> impl std::future::Future<Output = Result<User, ApiError>> + Send;

    /// `GET /lists`
    fn lists(&self) -> impl std::future::Future<Output = Result<Vec<List>, ApiError>> + Send;

    /// `POST /lists`, returning the server-assigned id.
    fn create_list(
        &self,
        body: &ListBody,
    ) -> impl std::future::Future<Output = Result<ListId, ApiError>> + Send;

    /// `PUT /lists/{id}`
    fn update_list(
        &self,
        id: &ListId,
        body: &ListBody,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /lists/{id}`
    fn delete_list(
        &self,
        id: &ListId,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `GET /lists/{id}/tasks`. A missing `tasks` field yields an empty vec.
    fn tasks(
        &self,
        list: &ListId,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `POST /lists/{id}/tasks`, returning the server-assigned id.
    fn create_task(
        &self,
        list: &ListId,
        body: &TaskBody,
    ) -> impl std::future::Future<Output = Result<TaskId, ApiError>> + Send;

    /// `PUT /lists/{id}/tasks/{task}`. Keys the patch leaves out keep their
    /// stored value.
    fn update_task(
        &self,
        list: &ListId,
        id: &TaskId,
        body: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /lists/{id}/tasks/{task}`
    fn delete_task(
        &self,
        list: &ListId,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}
