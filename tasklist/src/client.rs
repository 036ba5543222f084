//! One handle over the session and both stores.
//!
//! [`TodoClient`] threads the list store's current list into every task
//! operation and runs the list-switch protocol
//! (reset tasks, set current list, force-fetch tasks) as a single call.

use std::sync::Arc;

use tasklist_proto::auth::{Credentials, NewUser, User};
use tasklist_proto::{List, ListId, Task, TaskId};

use crate::api::Api;
use crate::session::Session;
use crate::store::lists::ListStore;
use crate::store::tasks::{NewTask, TaskFilter, TaskStore, TaskUpdate};
use crate::store::title::TitlePolicy;
use crate::store::{FetchOutcome, StoreError};

/// Session plus list and task caches sharing one [`Api`].
pub struct TodoClient<A> {
    api: Arc<A>,
    session: Session,
    lists: ListStore<A>,
    tasks: TaskStore<A>,
}

impl<A> Clone for TodoClient<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: self.session.clone(),
            lists: self.lists.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<A: Api + 'static> TodoClient<A> {
    /// Creates a client with the default title policy.
    ///
    /// `session` must be the one `api` authorizes requests from.
    pub fn new(api: A, session: Session) -> Self {
        Self::with_titles(api, session, TitlePolicy::default())
    }

    /// Creates a client with a custom title policy.
    pub fn with_titles(api: A, session: Session, titles: TitlePolicy) -> Self {
        let api = Arc::new(api);
        Self {
            lists: ListStore::new(Arc::clone(&api), session.clone()),
            tasks: TaskStore::with_titles(Arc::clone(&api), session.clone(), titles),
            api,
            session,
        }
    }

    /// The shared session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The list store.
    #[must_use]
    pub const fn list_store(&self) -> &ListStore<A> {
        &self.lists
    }

    /// The task store.
    #[must_use]
    pub const fn task_store(&self) -> &TaskStore<A> {
        &self.tasks
    }

    /// Signs in with `POST /signin` and keeps the returned token.
    ///
    /// Caches from a previous session are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the server rejects the credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = self
            .api
            .sign_in(&credentials)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "sign-in failed"))?;
        self.start_session(token.token);
        tracing::info!("signed in");
        Ok(())
    }

    /// Creates an account with `POST /users` and keeps the returned token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the server rejects the account.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<(), StoreError> {
        let user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = self
            .api
            .sign_up(&user)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "sign-up failed"))?;
        self.start_session(token.token);
        tracing::info!("signed up");
        Ok(())
    }

    /// Drops the token and both caches.
    pub fn sign_out(&self) {
        self.session.clear();
        self.reset_all();
        tracing::info!("signed out");
    }

    /// Fetches the signed-in user with `GET /users`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn user(&self) -> Result<User, StoreError> {
        Ok(self.api.user().await?)
    }

    fn start_session(&self, token: String) {
        self.reset_all();
        self.session.set_token(token);
    }

    fn reset_all(&self) {
        self.tasks.reset_tasks();
        self.lists.reset();
    }

    /// See [`ListStore::fetch_lists`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn fetch_lists(&self, force: bool) -> Result<FetchOutcome, StoreError> {
        self.lists.fetch_lists(force).await
    }

    /// See [`ListStore::create_list`].
    ///
    /// # Errors
    ///
    /// See [`ListStore::create_list`].
    pub async fn create_list(&self, title: &str, detail: Option<&str>) -> Result<ListId, StoreError> {
        self.lists.create_list(title, detail).await
    }

    /// See [`ListStore::update_list`].
    ///
    /// # Errors
    ///
    /// See [`ListStore::update_list`].
    pub async fn update_list(
        &self,
        id: &ListId,
        title: &str,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        self.lists.update_list(id, title, detail).await
    }

    /// Deletes a list. If that moves the current list, the task cache is
    /// emptied so it never shows the deleted list's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn delete_list(&self, id: &ListId) -> Result<(), StoreError> {
        let before = self.lists.current_list_id();
        self.lists.delete_list(id).await?;
        if self.lists.current_list_id() != before {
            self.tasks.reset_tasks();
        }
        Ok(())
    }

    /// Points task operations at `id` without touching the task cache.
    pub fn set_current_list(&self, id: ListId) {
        self.lists.set_current_list(id);
    }

    /// Switches to list `id`: empties the task cache, makes `id` current,
    /// then force-fetches its tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the task fetch fails. The switch
    /// itself has already happened by then.
    pub async fn select_list(&self, id: ListId) -> Result<FetchOutcome, StoreError> {
        tracing::debug!(list_id = %id, "switching list");
        self.tasks.reset_tasks();
        self.lists.set_current_list(id.clone());
        self.tasks.fetch_tasks(&id, true).await
    }

    fn current(&self) -> Result<ListId, StoreError> {
        self.lists
            .current_list_id()
            .ok_or(StoreError::NoCurrentList)
    }

    /// Fetches the tasks of the current list.
    ///
    /// Returns [`FetchOutcome::NoList`] when no list is current.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn fetch_tasks(&self, force: bool) -> Result<FetchOutcome, StoreError> {
        let Some(list) = self.lists.current_list_id() else {
            return Ok(FetchOutcome::NoList);
        };
        self.tasks.fetch_tasks(&list, force).await
    }

    /// Creates a task in the current list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoCurrentList`] without sending anything when no
    /// list is current, or [`StoreError::Api`] if the request fails.
    pub async fn create_task(&self, new: NewTask) -> Result<TaskId, StoreError> {
        let list = self.current()?;
        self.tasks.create_task(&list, new).await
    }

    /// Updates a task of the current list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoCurrentList`] or [`StoreError::TaskNotFound`]
    /// without sending anything, or [`StoreError::Api`] if the request fails.
    pub async fn update_task(&self, update: TaskUpdate) -> Result<Task, StoreError> {
        let list = self.current()?;
        self.tasks.update_task(&list, update).await
    }

    /// Deletes a task of the current list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoCurrentList`] without sending anything when no
    /// list is current, or [`StoreError::Api`] if the request fails.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let list = self.current()?;
        self.tasks.delete_task(&list, id).await
    }

    /// Empties the task cache.
    pub fn reset_tasks(&self) {
        self.tasks.reset_tasks();
    }

    /// Cached lists.
    #[must_use]
    pub fn lists(&self) -> Option<Vec<List>> {
        self.lists.lists()
    }

    /// Current list id.
    #[must_use]
    pub fn current_list_id(&self) -> Option<ListId> {
        self.lists.current_list_id()
    }

    /// Cached entry of the current list.
    #[must_use]
    pub fn current_list(&self) -> Option<List> {
        self.lists.current_list()
    }

    /// Cached tasks.
    #[must_use]
    pub fn tasks(&self) -> Option<Vec<Task>> {
        self.tasks.tasks()
    }

    /// Cached tasks passing `filter`.
    #[must_use]
    pub fn filtered_tasks(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks.filtered(filter)
    }

    /// Number of cached tasks not yet done.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.tasks.incomplete_count()
    }

    /// Whether either store is fetching.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lists.is_loading() || self.tasks.is_loading()
    }
}
