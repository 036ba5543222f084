//! Cache of the user's lists and the current-list pointer.

use std::sync::Arc;

use parking_lot::RwLock;
use tasklist_proto::{List, ListBody, ListId};

use super::inflight::{Flight, InFlight};
use super::{FetchOutcome, HasLoading, Loading, LoadingGuard, StoreError};
use crate::api::Api;
use crate::session::Session;

#[derive(Debug, Default)]
struct ListState {
    lists: Option<Vec<List>>,
    current: Option<ListId>,
    loading: Loading,
}

impl HasLoading for ListState {
    fn loading_mut(&mut self) -> &mut Loading {
        &mut self.loading
    }
}

/// Client-side cache of the user's lists.
///
/// `lists` stays `None` until the first successful fetch. `current` is
/// either `None` or the id of a cached list, except after an explicit
/// [`set_current_list`](Self::set_current_list) with an unknown id.
pub struct ListStore<A> {
    api: Arc<A>,
    session: Session,
    state: Arc<RwLock<ListState>>,
    inflight: InFlight<u64>,
}

impl<A> Clone for ListStore<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: self.session.clone(),
            state: Arc::clone(&self.state),
            inflight: self.inflight.clone(),
        }
    }
}

impl<A: Api + 'static> ListStore<A> {
    /// Creates an empty store.
    pub fn new(api: Arc<A>, session: Session) -> Self {
        Self {
            api,
            session,
            state: Arc::new(RwLock::new(ListState::default())),
            inflight: InFlight::default(),
        }
    }

    /// Loads the lists with `GET /lists`.
    ///
    /// Without `force`, an already loaded cache is returned as is. A fetch
    /// already running is joined rather than repeated. On success the first
    /// list becomes current. A response that lands after [`reset`](Self::reset)
    /// is dropped and reported as [`FetchOutcome::Discarded`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails; the cache is left
    /// untouched.
    pub async fn fetch_lists(&self, force: bool) -> Result<FetchOutcome, StoreError> {
        let epoch = {
            let state = self.state.read();
            if !force && state.lists.is_some() {
                return Ok(FetchOutcome::Cached);
            }
            state.loading.epoch()
        };
        if !self.session.is_authenticated() {
            tracing::debug!("no session, skipping list fetch");
            return Ok(FetchOutcome::NoSession);
        }

        let flight = self.inflight.join_or_spawn(epoch, || {
            let guard = LoadingGuard::begin(&self.state);
            let api = Arc::clone(&self.api);
            let state = Arc::clone(&self.state);
            async move {
                let lists = api
                    .lists()
                    .await
                    .inspect_err(|e| tracing::warn!(error = %e, "failed to fetch lists"))?;
                let applied = {
                    let mut state = state.write();
                    let applied = state.loading.is_current(guard.epoch());
                    if applied {
                        tracing::debug!(count = lists.len(), "lists fetched");
                        state.current = lists.first().map(|l| l.id.clone());
                        state.lists = Some(lists);
                    } else {
                        tracing::debug!("lists reset during fetch, discarding result");
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

    /// Creates a list with `POST /lists` and returns its server-assigned id.
    ///
    /// The new list is appended to a loaded cache. `current` is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyTitle`] without sending anything if the
    /// title is blank, or [`StoreError::Api`] if the request fails.
    pub async fn create_list(
        &self,
        title: &str,
        detail: Option<&str>,
    ) -> Result<ListId, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let body = ListBody {
            title: title.to_string(),
            detail: detail.map(str::to_string),
        };
        let id = self
            .api
            .create_list(&body)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "failed to create list"))?;

        tracing::info!(list_id = %id, "list created");
        if let Some(lists) = self.state.write().lists.as_mut() {
            lists.push(body.into_list(id.clone()));
        }
        Ok(id)
    }

    /// Renames a list with `PUT /lists/{id}`.
    ///
    /// `detail` is only sent, and only applied locally, when it is `Some`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyTitle`] without sending anything if the
    /// title is blank, or [`StoreError::Api`] if the request fails.
    pub async fn update_list(
        &self,
        id: &ListId,
        title: &str,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let body = ListBody {
            title: title.to_string(),
            detail: detail.map(str::to_string),
        };
        self.api
            .update_list(id, &body)
            .await
            .inspect_err(|e| tracing::warn!(list_id = %id, error = %e, "failed to update list"))?;

        let mut state = self.state.write();
        if let Some(list) = state
            .lists
            .as_mut()
            .and_then(|lists| lists.iter_mut().find(|l| &l.id == id))
        {
            list.title = body.title;
            if body.detail.is_some() {
                list.detail = body.detail;
            }
        }
        Ok(())
    }

    /// Deletes a list with `DELETE /lists/{id}`.
    ///
    /// If it was current, the first remaining list becomes current.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the request fails.
    pub async fn delete_list(&self, id: &ListId) -> Result<(), StoreError> {
        self.api
            .delete_list(id)
            .await
            .inspect_err(|e| tracing::warn!(list_id = %id, error = %e, "failed to delete list"))?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        if let Some(lists) = state.lists.as_mut() {
            lists.retain(|l| &l.id != id);
        }
        if state.current.as_ref() == Some(id) {
            state.current = state
                .lists
                .as_ref()
                .and_then(|lists| lists.first())
                .map(|l| l.id.clone());
            tracing::debug!(current = ?state.current, "current list deleted");
        }
        tracing::info!(list_id = %id, "list deleted");
        Ok(())
    }

    /// Points task operations at `id`. No request is sent.
    pub fn set_current_list(&self, id: ListId) {
        self.state.write().current = Some(id);
    }

    /// Forgets everything, including any fetch still running.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.lists = None;
        state.current = None;
        state.loading.reset();
    }

    /// Snapshot of the cached lists, `None` until loaded.
    #[must_use]
    pub fn lists(&self) -> Option<Vec<List>> {
        self.state.read().lists.clone()
    }

    /// The current list id.
    #[must_use]
    pub fn current_list_id(&self) -> Option<ListId> {
        self.state.read().current.clone()
    }

    /// The cached entry for the current list.
    #[must_use]
    pub fn current_list(&self) -> Option<List> {
        let state = self.state.read();
        let current = state.current.as_ref()?;
        state
            .lists
            .as_ref()?
            .iter()
            .find(|l| &l.id == current)
            .cloned()
    }

    /// Whether a list fetch is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().loading.is_loading()
    }

    /// Whether a fetch has populated the cache.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.read().lists.is_some()
    }
}
