//! axum router exposing [`TodoStore`] as the tasklist REST API.
//!
//! Every route except `POST /users` and `POST /signin` reads the caller's
//! token from `Authorization: Bearer <token>`. Failures answer with the
//! status from [`ServerError`] and an [`ApiErrorBody`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tokio::task::JoinHandle;

use tasklist_proto::auth::{Credentials, NewUser, TokenBody, User};
use tasklist_proto::{
    ApiErrorBody, List, ListBody, ListId, Task, TaskBody, TaskId, TaskPatch, TasksEnvelope,
};

use crate::config::{DEFAULT_MAX_BODY_BYTES, ServerConfig};
use crate::store::{StoreError, TodoStore};

/// Error returned by a handler.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The store rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServerError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Unauthorized | StoreError::InvalidCredentials) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Store(StoreError::EmailTaken) => StatusCode::CONFLICT,
            Self::Store(StoreError::Missing(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::ListNotFound(_) | StoreError::TaskNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        let body = ApiErrorBody::new(i64::from(status.as_u16()), self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Bearer token of the request, if it carried one.
///
/// Extraction never fails; an absent or malformed header yields `None` and
/// the store answers 401.
#[derive(Debug)]
pub struct Bearer(pub Option<String>);

impl Bearer {
    fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Bearer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Ok(Self(token))
    }
}

type Shared = State<Arc<TodoStore>>;

async fn sign_up(
    State(store): Shared,
    Json(user): Json<NewUser>,
) -> Result<Json<TokenBody>, ServerError> {
    let token = store.sign_up(&user).await?;
    tracing::info!("account created");
    Ok(Json(TokenBody { token }))
}

async fn sign_in(
    State(store): Shared,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenBody>, ServerError> {
    let token = store.sign_in(&credentials).await?;
    Ok(Json(TokenBody { token }))
}

async fn user(State(store): Shared, bearer: Bearer) -> Result<Json<User>, ServerError> {
    Ok(Json(store.user(bearer.token()).await?))
}

async fn lists(State(store): Shared, bearer: Bearer) -> Result<Json<Vec<List>>, ServerError> {
    Ok(Json(store.lists(bearer.token()).await?))
}

async fn create_list(
    State(store): Shared,
    bearer: Bearer,
    Json(body): Json<ListBody>,
) -> Result<Json<List>, ServerError> {
    Ok(Json(store.create_list(bearer.token(), body).await?))
}

async fn update_list(
    State(store): Shared,
    bearer: Bearer,
    Path(list_id): Path<String>,
    Json(body): Json<ListBody>,
) -> Result<Json<List>, ServerError> {
    let id = ListId::new(list_id);
    Ok(Json(store.update_list(bearer.token(), &id, body).await?))
}

async fn delete_list(
    State(store): Shared,
    bearer: Bearer,
    Path(list_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    store
        .delete_list(bearer.token(), &ListId::new(list_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn tasks(
    State(store): Shared,
    bearer: Bearer,
    Path(list_id): Path<String>,
) -> Result<Json<TasksEnvelope>, ServerError> {
    let tasks = store.tasks(bearer.token(), &ListId::new(list_id)).await?;
    Ok(Json(TasksEnvelope { tasks: Some(tasks) }))
}

async fn create_task(
    State(store): Shared,
    bearer: Bearer,
    Path(list_id): Path<String>,
    Json(body): Json<TaskBody>,
) -> Result<Json<Task>, ServerError> {
    let list = ListId::new(list_id);
    Ok(Json(store.create_task(bearer.token(), &list, body).await?))
}

async fn update_task(
    State(store): Shared,
    bearer: Bearer,
    Path((list_id, task_id)): Path<(String, String)>,
    Json(body): Json<TaskPatch>,
) -> Result<Json<Task>, ServerError> {
    let (list, id) = (ListId::new(list_id), TaskId::new(task_id));
    Ok(Json(store.update_task(bearer.token(), &list, &id, body).await?))
}

async fn delete_task(
    State(store): Shared,
    bearer: Bearer,
    Path((list_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    let (list, id) = (ListId::new(list_id), TaskId::new(task_id));
    store.delete_task(bearer.token(), &list, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the REST router over `store`, rejecting bodies larger than
/// `max_body_bytes` with 413.
pub fn router(store: Arc<TodoStore>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/users", post(sign_up).get(user))
        .route("/signin", post(sign_in))
        .route("/lists", get(lists).post(create_list))
        .route("/lists/{list_id}", put(update_list).delete(delete_list))
        .route("/lists/{list_id}/tasks", get(tasks).post(create_task))
        .route(
            "/lists/{list_id}/tasks/{task_id}",
            put(update_task).delete(delete_task),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(store)
}

/// Bound address and the task serving it.
pub type Running = (SocketAddr, JoinHandle<()>);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serves an empty store on `addr` with default limits.
///
/// # Errors
///
/// Returns an error if `addr` cannot be bound.
pub async fn start_server(addr: &str) -> Result<Running, BoxError> {
    serve(addr, router(Arc::new(TodoStore::new()), DEFAULT_MAX_BODY_BYTES)).await
}

/// Serves `store` as `config` describes.
///
/// # Errors
///
/// Returns an error if the configured address cannot be bound.
pub async fn start_server_with_config(
    config: &ServerConfig,
    store: Arc<TodoStore>,
) -> Result<Running, BoxError> {
    serve(&config.bind_addr, router(store, config.max_body_bytes)).await
}

async fn serve(addr: &str, app: Router) -> Result<Running, BoxError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server stopped");
        }
    });
    Ok((addr, handle))
}
