//! Cache of the tasks of one list.
//!
//! Every operation names its list explicitly. The cache only ever holds the
//! tasks of a single list (its owner); results for any other list are sent
//! to the server but not merged locally.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tasklist_proto::{ListId, Task, TaskBody, TaskId, TaskPatch, limit};

use super::inflight::{Flight, InFlight};
use super::title::TitlePolicy;
use super::{FetchOutcome, HasLoading, Loading, LoadingGuard, StoreError};
use crate::api::Api;
use crate::session::Session;

/// Fields of a task to create.
///
/// A missing or blank title is derived by the store's [`TitlePolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Explicit title.
    pub title: Option<String>,
    /// Free-text description.
    pub detail: String,
    /// Initial completion flag.
    pub done: bool,
    /// Optional due date.
    pub limit: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A task described by `detail`, with no explicit title.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the completion flag.
    #[must_use]
    pub const fn done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn limit(mut self, limit: DateTime<Utc>) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A partial change to an existing task. `None` leaves a field as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Task to change.
    pub id: TaskId,
    /// New title.
    pub title: Option<String>,
    /// New detail.
    pub detail: Option<String>,
    /// New completion flag.
    pub done: Option<bool>,
    /// New due date; `Some(None)` clears it.
    pub limit: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    /// An update that changes nothing yet.
    #[must_use]
    pub const fn new(id: TaskId) -> Self {
        Self {
            id,
            title: None,
            detail: None,
            done: None,
            limit: None,
        }
    }

    /// Changes the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Changes the detail.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Changes the completion flag.
    #[must_use]
    pub const fn done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    /// Sets or clears the due date.
    #[must_use]
    pub const fn limit(mut self, limit: Option<DateTime<Utc>>) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `base` with this update's fields laid over it, limit cut to whole
    /// seconds.
    #[must_use]
    pub fn merge_into(&self, base: &Task) -> Task {
        Task {
            id: base.id.clone(),
            title: self.title.clone().unwrap_or_else(|| base.title.clone()),
            detail: self.detail.clone().unwrap_or_else(|| base.detail.clone()),
            done: self.done.unwrap_or(base.done),
            limit: self.limit.unwrap_or(base.limit).map(limit::truncate),
        }
    }
}

/// Which tasks a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    /// Every task.
    #[default]
    All,
    /// Tasks not done yet.
    Incomplete,
    /// Tasks marked done.
    Completed,
}

impl TaskFilter {
    /// Whether `task` passes the filter.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Incomplete => !task.done,
            Self::Completed => task.done,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "incomplete" => Ok(Self::Incomplete),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "unknown filter {other:?}, expected all, incomplete or completed"
            )),
        }
    }
}

/// Cache state. `owner` is the list whose tasks `tasks` holds; `loaded_for`
/// is only set by a full fetch and is what the fetch guard compares.
#[derive(Debug, Default)]
struct TaskState {
    tasks: Option<Vec<Task>>,
    owner: Option<ListId>,
    loaded_for: Option<ListId>,
    loading: Loading,
}

impl TaskState {
    fn cached_mut(&mut self, list: &ListId) -> Option<&mut Vec<Task>> {
        if self.owner.as_ref() == Some(list) {
            self.tasks.as_mut()
        } else {
            None
        }
    }

    fn cached(&self, list: &ListId) -> Option<&[Task]> {
        if self.owner.as_ref() == Some(list) {
            self.tasks.as_deref()
        } else {
            None
        }
    }
}

impl HasLoading for TaskState {
    fn loading_mut(&mut self) -> &mut Loading {
        &mut self.loading
    }
}

/// Client-side cache of the tasks of one list at a time.
pub struct TaskStore<A> {
    api: Arc<A>,
    session: Session,
    state: Arc<RwLock<TaskState>>,
    inflight: InFlight<(u64, ListId)>,
    titles: TitlePolicy,
}

impl<A> Clone for TaskStore<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: self.session.clone(),
            state: Arc::clone(&self.state),
            inflight: self.inflight.clone(),
            titles: self.titles.clone(),
        }
    }
}

impl<A: Api + 'static> TaskStore<A> {
    /// Creates an empty store with the default title policy.
    pub fn new(api: Arc<A>, session: Session) -> Self {
        Self::with_titles(api, session, TitlePolicy::default())
    }

    /// Creates an empty store with a custom title policy.
    pub fn with_titles(api: Arc<A>, session: Session, titles: TitlePolicy) -> Self {
        Self {
            api,
            session,
            state: Arc::new(RwLock::new(TaskState::default())),
            inflight: InFlight::default(),
            titles,
        }
    }

    /// Loads the tasks of `list` with `GET /lists/{list}/tasks`.
    ///
    /// Without `force`, nothing is sent when the cache was already loaded
    /// for `list`. A fetch of the same list already running is joined, even
    /// when forced. A result that lands after [`reset_tasks`](Self::reset_tasks)
    /// is dropped and reported as [`FetchOutcome::Discarded`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails; the cache is left
    /// untouched.
    pub async fn fetch_tasks(
        &self,
        list: &ListId,
        force: bool,
    ) -> Result<FetchOutcome, StoreError> {
        let epoch = {
            let state = self.state.read();
            if !force && state.loaded_for.as_ref() == Some(list) {
                return Ok(FetchOutcome::Cached);
            }
            state.loading.epoch()
        };
        if !self.session.is_authenticated() {
            tracing::debug!(list_id = %list, "no session, skipping task fetch");
            return Ok(FetchOutcome::NoSession);
        }

        let flight = self.inflight.join_or_spawn((epoch, list.clone()), || {
            let guard = LoadingGuard::begin(&self.state);
            let api = Arc::clone(&self.api);
            let state = Arc::clone(&self.state);
            let list = list.clone();
            async move {
                let tasks = api.tasks(&list).await.inspect_err(|e| {
                    tracing::warn!(list_id = %list, error = %e, "failed to fetch tasks");
                })?;
                let applied = {
                    let mut state = state.write();
                    let applied = state.loading.is_current(guard.epoch());
                    if applied {
                        tracing::debug!(list_id = %list, count = tasks.len(), "tasks fetched");
                        state.tasks = Some(tasks);
                        state.owner = Some(list.clone());
                        state.loaded_for = Some(list);
                    } else {
                        tracing::debug!(list_id = %list, "tasks reset during fetch, discarding result");
                    }
                    applied
                };
                drop(guard);
                Ok::<bool, StoreError>(applied)
            }
        });

        let (fetch, outcome) = match flight {
            Flight::Started(fetch) => (fetch, FetchOutcome::Fetched),
            Flight::Joined(fetch) => (fetch, FetchOutcome::Joined),
        };
        Ok(if fetch.await? { outcome } else { FetchOutcome::Discarded })
    }

    /// Creates a task in `list` with `POST /lists/{list}/tasks`.
    ///
    /// The title is resolved by the store's [`TitlePolicy`] and the limit is
    /// cut to whole seconds, as the wire carries it. On success the
    /// task is appended when the cache belongs to `list`; an empty cache is
    /// started for `list` if nothing was cached and no reset intervened.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn create_task(&self, list: &ListId, new: NewTask) -> Result<TaskId, StoreError> {
        let epoch = self.state.read().loading.epoch();
        let body = TaskBody {
            title: self.titles.resolve(new.title.as_deref(), &new.detail),
            detail: new.detail,
            done: new.done,
            limit: new.limit.map(limit::truncate),
        };
        let id = self
            .api
            .create_task(list, &body)
            .await
            .inspect_err(|e| tracing::warn!(list_id = %list, error = %e, "failed to create task"))?;

        tracing::info!(list_id = %list, task_id = %id, "task created");
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.tasks.is_none() && state.loading.is_current(epoch) {
            state.tasks = Some(Vec::new());
            state.owner = Some(list.clone());
        }
        if let Some(tasks) = state.cached_mut(list) {
            tasks.push(body.into_task(id.clone()));
        }
        Ok(id)
    }

    /// Changes a cached task with `PUT /lists/{list}/tasks/{id}`.
    ///
    /// The body sent is the cached task with `update` merged over it, every
    /// field included and a cleared limit sent as `null`, so the server holds
    /// what the cache holds. Returns the merged task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] without sending anything if the
    /// task is not cached for `list`, or [`StoreError::Api`] if the request
    /// fails.
    pub async fn update_task(&self, list: &ListId, update: TaskUpdate) -> Result<Task, StoreError> {
        let merged = {
            let state = self.state.read();
            let base = state
                .cached(list)
                .and_then(|tasks| tasks.iter().find(|t| t.id == update.id))
                .ok_or_else(|| StoreError::TaskNotFound(update.id.clone()))?;
            update.merge_into(base)
        };

        self.api
            .update_task(list, &merged.id, &TaskPatch::from(&merged))
            .await
            .inspect_err(|e| {
                tracing::warn!(list_id = %list, task_id = %merged.id, error = %e, "failed to update task");
            })?;

        if let Some(task) = self
            .state
            .write()
            .cached_mut(list)
            .and_then(|tasks| tasks.iter_mut().find(|t| t.id == merged.id))
        {
            *task = merged.clone();
        }
        tracing::debug!(list_id = %list, task_id = %merged.id, "task updated");
        Ok(merged)
    }

    /// Deletes a task with `DELETE /lists/{list}/tasks/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn delete_task(&self, list: &ListId, id: &TaskId) -> Result<(), StoreError> {
        self.api
            .delete_task(list, id)
            .await
            .inspect_err(|e| {
                tracing::warn!(list_id = %list, task_id = %id, error = %e, "failed to delete task");
            })?;

        if let Some(tasks) = self.state.write().cached_mut(list) {
            tasks.retain(|t| &t.id != id);
        }
        tracing::info!(list_id = %list, task_id = %id, "task deleted");
        Ok(())
    }

    /// Empties the cache ahead of a list switch.
    ///
    /// Fetches still running keep running but their results are dropped.
    pub fn reset_tasks(&self) {
        let mut state = self.state.write();
        state.tasks = None;
        state.owner = None;
        state.loaded_for = None;
        state.loading.reset();
    }

    /// Snapshot of the cached tasks, `None` when nothing is cached.
    #[must_use]
    pub fn tasks(&self) -> Option<Vec<Task>> {
        self.state.read().tasks.clone()
    }

    /// A cached task by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state
            .read()
            .tasks
            .as_ref()?
            .iter()
            .find(|t| &t.id == id)
            .cloned()
    }

    /// The list whose tasks a full fetch last loaded.
    #[must_use]
    pub fn loaded_for(&self) -> Option<ListId> {
        self.state.read().loaded_for.clone()
    }

    /// The list the cached tasks belong to.
    #[must_use]
    pub fn owner(&self) -> Option<ListId> {
        self.state.read().owner.clone()
    }

    /// Whether a task fetch is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().loading.is_loading()
    }

    /// Number of cached tasks not yet done.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.state
            .read()
            .tasks
            .as_ref()
            .map_or(0, |tasks| tasks.iter().filter(|t| !t.done).count())
    }

    /// Cached tasks passing `filter`, in cache order.
    #[must_use]
    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.state
            .read()
            .tasks
            .iter()
            .flatten()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// The policy used to title new tasks.
    #[must_use]
    pub const fn titles(&self) -> &TitlePolicy {
        &self.titles
    }
}
