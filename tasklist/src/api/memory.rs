//! In-process fake of the REST API for tests.
//!
//! [`InMemoryApi`] answers every [`Api`] call from an in-memory model and
//! records what was asked of it, so tests can assert on the exact requests
//! the stores send (or did not send). It reads the bearer token from the
//! same [`Session`] the stores use, which keeps the unauthenticated paths
//! honest: a fetch that short-circuits never shows up in the request log,
//! while a mutation without a token is recorded and rejected with 401.
//!
//! Two test hooks:
//! - [`fail_next`](InMemoryApi::fail_next) queues an error for the next call.
//! - [`hold_reads`](InMemoryApi::hold_reads) parks every `GET` after it has
//!   been recorded until [`release_reads`](InMemoryApi::release_reads).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use tasklist_proto::auth::{Credentials, NewUser, TokenBody, User};
use tasklist_proto::{List, ListBody, ListId, Task, TaskBody, TaskId, TaskPatch};

use super::{Api, ApiError, Method};
use crate::session::Session;

/// One request as the fake server saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, e.g. `/lists/L1/tasks`.
    pub path: String,
    /// JSON body, if the call carried one.
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct Account {
    name: String,
    email: String,
    password: String,
    token: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Account>,
    tokens: HashSet<String>,
    lists: Vec<List>,
    tasks: HashMap<ListId, Vec<Task>>,
    next_list: u64,
    next_task: u64,
    next_token: u64,
    requests: Vec<Recorded>,
    failures: VecDeque<ApiError>,
}

impl State {
    fn list_exists(&self, id: &ListId) -> bool {
        self.lists.iter().any(|l| &l.id == id)
    }

    fn issue_token(&mut self) -> String {
        self.next_token += 1;
        let token = format!("token-{}", self.next_token);
        self.tokens.insert(token.clone());
        token
    }
}

struct Inner {
    session: Session,
    state: Mutex<State>,
    reads_held: watch::Sender<bool>,
}

/// Fake REST server living in the test process.
///
/// Cloning yields another handle to the same server, so a test can hand one
/// clone to the stores and keep one for assertions.
#[derive(Clone)]
pub struct InMemoryApi {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InMemoryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryApi")
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

impl InMemoryApi {
    /// Creates an empty server that authorizes requests from `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let (reads_held, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                session,
                state: Mutex::new(State::default()),
                reads_held,
            }),
        }
    }

    /// Creates a server and signs `session` in with a freshly issued token.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        let api = Self::new(session);
        let token = api.inner.state.lock().issue_token();
        api.inner.session.set_token(token);
        api
    }

    /// Marks `token` as valid without creating an account.
    pub fn accept_token(&self, token: impl Into<String>) {
        self.inner.state.lock().tokens.insert(token.into());
    }

    /// Adds a list directly, bypassing the request log.
    pub fn insert_list(&self, title: &str, detail: Option<&str>) -> ListId {
        let mut state = self.inner.state.lock();
        state.next_list += 1;
        let id = ListId::new(format!("L{}", state.next_list));
        state.lists.push(List {
            id: id.clone(),
            title: title.to_string(),
            detail: detail.map(str::to_string),
        });
        state.tasks.insert(id.clone(), Vec::new());
        id
    }

    /// Adds a task directly, bypassing the request log.
    ///
    /// Returns `None` if `list` does not exist.
    pub fn insert_task(&self, list: &ListId, body: TaskBody) -> Option<TaskId> {
        let mut state = self.inner.state.lock();
        if !state.list_exists(list) {
            return None;
        }
        state.next_task += 1;
        let id = TaskId::new(format!("T{}", state.next_task));
        state
            .tasks
            .entry(list.clone())
            .or_default()
            .push(body.into_task(id.clone()));
        Some(id)
    }

    /// The server's current lists.
    #[must_use]
    pub fn lists_snapshot(&self) -> Vec<List> {
        self.inner.state.lock().lists.clone()
    }

    /// The server's current tasks of `list`.
    #[must_use]
    pub fn tasks_snapshot(&self, list: &ListId) -> Vec<Task> {
        self.inner
            .state
            .lock()
            .tasks
            .get(list)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.state.lock().requests.clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.state.lock().requests.len()
    }

    /// Forgets the request log.
    pub fn clear_requests(&self) {
        self.inner.state.lock().requests.clear();
    }

    /// Makes the next call fail with `err` after it is recorded.
    pub fn fail_next(&self, err: ApiError) {
        self.inner.state.lock().failures.push_back(err);
    }

    /// Parks every subsequent `GET` until [`release_reads`](Self::release_reads).
    pub fn hold_reads(&self) {
        self.inner.reads_held.send_replace(true);
    }

    /// Lets parked and future `GET`s complete.
    pub fn release_reads(&self) {
        self.inner.reads_held.send_replace(false);
    }

    /// Records the request, then applies the read hold, the failure queue
    /// and the auth check, in that order.
    async fn admit<B: Serialize>(
        &self,
        method: Method,
        path: String,
        body: Option<&B>,
        needs_auth: bool,
    ) -> Result<(), ApiError> {
        let body = body.and_then(|b| serde_json::to_value(b).ok());
        self.inner
            .state
            .lock()
            .requests
            .push(Recorded { method, path, body });

        if method == Method::Get {
            let mut held = self.inner.reads_held.subscribe();
            let _ = held.wait_for(|held| !*held).await;
        }

        let mut state = self.inner.state.lock();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        if needs_auth {
            let authorized = self
                .inner
                .session
                .token()
                .is_some_and(|t| state.tokens.contains(&t));
            if !authorized {
                return Err(ApiError::Unauthorized {
                    status: 401,
                    message: "authentication required".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Api for InMemoryApi {
    async fn sign_up(&self, user: &NewUser) -> Result<TokenBody, ApiError> {
        self.admit(Method::Post, "/users".to_string(), Some(user), false)
            .await?;
        let mut state = self.inner.state.lock();
        if state.accounts.iter().any(|a| a.email == user.email) {
            return Err(ApiError::Status {
                status: 409,
                message: "email already registered".to_string(),
            });
        }
        let token = state.issue_token();
        state.accounts.push(Account {
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            token: token.clone(),
        });
        Ok(TokenBody { token })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<TokenBody, ApiError> {
        self.admit(Method::Post, "/signin".to_string(), Some(credentials), false)
            .await?;
        let state = self.inner.state.lock();
        state
            .accounts
            .iter()
            .find(|a| a.email == credentials.email && a.password == credentials.password)
            .map(|a| TokenBody {
                token: a.token.clone(),
            })
            .ok_or_else(|| ApiError::Unauthorized {
                status: 401,
                message: "invalid email or password".to_string(),
            })
    }

    async fn user(&self) -> Result<User, ApiError> {
        self.admit::<()>(Method::Get, "/users".to_string(), None, true)
            .await?;
        let token = self.inner.session.token();
        let state = self.inner.state.lock();
        let name = state
            .accounts
            .iter()
            .find(|a| Some(&a.token) == token.as_ref())
            .map_or_else(|| "test user".to_string(), |a| a.name.clone());
        Ok(User { name })
    }

    async fn lists(&self) -> Result<Vec<List>, ApiError> {
        self.admit::<()>(Method::Get, "/lists".to_string(), None, true)
            .await?;
        Ok(self.inner.state.lock().lists.clone())
    }

    async fn create_list(&self, body: &ListBody) -> Result<ListId, ApiError> {
        self.admit(Method::Post, "/lists".to_string(), Some(body), true)
            .await?;
        let mut state = self.inner.state.lock();
        state.next_list += 1;
        let id = ListId::new(format!("L{}", state.next_list));
        state.lists.push(body.clone().into_list(id.clone()));
        state.tasks.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn update_list(&self, id: &ListId, body: &ListBody) -> Result<(), ApiError> {
        self.admit(Method::Put, format!("/lists/{id}"), Some(body), true)
            .await?;
        let mut state = self.inner.state.lock();
        let list = state
            .lists
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| not_found("list"))?;
        list.title.clone_from(&body.title);
        if body.detail.is_some() {
            list.detail.clone_from(&body.detail);
        }
        Ok(())
    }

    async fn delete_list(&self, id: &ListId) -> Result<(), ApiError> {
        self.admit::<()>(Method::Delete, format!("/lists/{id}"), None, true)
            .await?;
        let mut state = self.inner.state.lock();
        if !state.list_exists(id) {
            return Err(not_found("list"));
        }
        state.lists.retain(|l| &l.id != id);
        state.tasks.remove(id);
        Ok(())
    }

    async fn tasks(&self, list: &ListId) -> Result<Vec<Task>, ApiError> {
        self.admit::<()>(Method::Get, format!("/lists/{list}/tasks"), None, true)
            .await?;
        let state = self.inner.state.lock();
        state.tasks.get(list).cloned().ok_or_else(|| not_found("list"))
    }

    async fn create_task(&self, list: &ListId, body: &TaskBody) -> Result<TaskId, ApiError> {
        self.admit(Method::Post, format!("/lists/{list}/tasks"), Some(body), true)
            .await?;
        let mut state = self.inner.state.lock();
        if !state.list_exists(list) {
            return Err(not_found("list"));
        }
        state.next_task += 1;
        let id = TaskId::new(format!("T{}", state.next_task));
        state
            .tasks
            .entry(list.clone())
            .or_default()
            .push(body.clone().into_task(id.clone()));
        Ok(id)
    }

    async fn update_task(
        &self,
        list: &ListId,
        id: &TaskId,
        body: &TaskPatch,
    ) -> Result<(), ApiError> {
        self.admit(
            Method::Put,
            format!("/lists/{list}/tasks/{id}"),
            Some(body),
            true,
        )
        .await?;
        let mut state = self.inner.state.lock();
        let task = state
            .tasks
            .get_mut(list)
            .and_then(|tasks| tasks.iter_mut().find(|t| &t.id == id))
            .ok_or_else(|| not_found("task"))?;
        body.clone().apply(task);
        Ok(())
    }

    async fn delete_task(&self, list: &ListId, id: &TaskId) -> Result<(), ApiError> {
        self.admit::<()>(
            Method::Delete,
            format!("/lists/{list}/tasks/{id}"),
            None,
            true,
        )
        .await?;
        let mut state = self.inner.state.lock();
        let tasks = state.tasks.get_mut(list).ok_or_else(|| not_found("list"))?;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(not_found("task"));
        }
        Ok(())
    }
}
