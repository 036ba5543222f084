//! reqwest-backed implementation of [`Api`].
//!
//! Every request carries `Authorization: Bearer <token>` when the shared
//! [`Session`] holds a token. Bodies are JSON in both directions; error
//! responses are decoded into [`ApiErrorBody`] to recover the server's
//! message.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use tasklist_proto::auth::{Credentials, NewUser, TokenBody, User};
use tasklist_proto::codec;
use tasklist_proto::{
    ApiErrorBody, Created, List, ListBody, ListId, Task, TaskBody, TaskId, TaskPatch,
    TasksEnvelope,
};

use super::{Api, ApiError, Method};
use crate::session::Session;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the tasklist REST API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    session: Session,
}

impl HttpApi {
    /// Creates a client for `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute
    /// URL that can carry a path, or [`ApiError::Transport`] if the
    /// underlying client cannot be built.
    pub fn new(base_url: &str, session: Session) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Same as [`HttpApi::new`].
    pub fn with_timeout(
        base_url: &str,
        session: Session,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base,
            session,
        })
    }

    /// The base URL endpoints are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request and returns the raw body of a 2xx response.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();

        let mut request = self.client.request(to_reqwest(method), url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        tracing::debug!(%method, %path, "sending request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %path, error = %e, "request did not complete");
            ApiError::Transport(e.to_string())
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let error_body = codec::decode::<ApiErrorBody>(&bytes).ok();
        let err = ApiError::from_status(status.as_u16(), error_body.as_ref());
        tracing::warn!(%method, %path, status = status.as_u16(), error = %err, "request rejected");
        Err(err)
    }

    /// Sends a request and decodes the JSON response.
    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let payload = body.map(codec::encode).transpose()?;
        let bytes = self.send(method, segments, payload).await?;
        Ok(codec::decode(&bytes)?)
    }

    /// Sends a request whose response body is not needed.
    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let payload = body.map(codec::encode).transpose()?;
        self.send(method, segments, payload).await.map(drop)
    }
}

const fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Api for HttpApi {
    async fn sign_up(&self, user: &NewUser) -> Result<TokenBody, ApiError> {
        self.call(Method::Post, &["users"], Some(user)).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<TokenBody, ApiError> {
        self.call(Method::Post, &["signin"], Some(credentials)).await
    }

    async fn user(&self) -> Result<User, ApiError> {
        self.call::<(), _>(Method::Get, &["users"], None).await
    }

    async fn lists(&self) -> Result<Vec<List>, ApiError> {
        self.call::<(), _>(Method::Get, &["lists"], None).await
    }

    async fn create_list(&self, body: &ListBody) -> Result<ListId, ApiError> {
        let created: Created<ListId> = self.call(Method::Post, &["lists"], Some(body)).await?;
        Ok(created.id)
    }

    async fn update_list(&self, id: &ListId, body: &ListBody) -> Result<(), ApiError> {
        self.execute(Method::Put, &["lists", id.as_str()], Some(body))
            .await
    }

    async fn delete_list(&self, id: &ListId) -> Result<(), ApiError> {
        self.execute::<()>(Method::Delete, &["lists", id.as_str()], None)
            .await
    }

    async fn tasks(&self, list: &ListId) -> Result<Vec<Task>, ApiError> {
        let envelope: Option<TasksEnvelope> = self
            .call::<(), _>(Method::Get, &["lists", list.as_str(), "tasks"], None)
            .await?;
        Ok(envelope.unwrap_or_default().into_tasks())
    }

    async fn create_task(&self, list: &ListId, body: &TaskBody) -> Result<TaskId, ApiError> {
        let created: Created<TaskId> = self
            .call(Method::Post, &["lists", list.as_str(), "tasks"], Some(body))
            .await?;
        Ok(created.id)
    }

    async fn update_task(
        &self,
        list: &ListId,
        id: &TaskId,
        body: &TaskPatch,
    ) -> Result<(), ApiError> {
        self.execute(
            Method::Put,
            &["lists", list.as_str(), "tasks", id.as_str()],
            Some(body),
        )
        .await
    }

    async fn delete_task(&self, list: &ListId, id: &TaskId) -> Result<(), ApiError> {
        self.execute::<()>(
            Method::Delete,
            &["lists", list.as_str(), "tasks", id.as_str()],
            None,
        )
        .await
    }
}
