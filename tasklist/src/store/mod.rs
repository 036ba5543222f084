//! Client-side caches of lists and tasks.
//!
//! [`ListStore`](lists::ListStore) owns the user's lists and the current-list
//! pointer. [`TaskStore`](tasks::TaskStore) owns the tasks of one list at a
//! time and takes the list id explicitly on every call. Both follow the same
//! shape: send the request through [`Api`](crate::api::Api), apply the local
//! mutation only after it succeeds, and surface failures as [`StoreError`].
//!
//! Fetches are deduplicated per cache key through [`inflight::InFlight`] and
//! drive a loading counter that a [`LoadingGuard`] always releases.

pub mod inflight;
pub mod lists;
pub mod tasks;
pub mod title;

use std::sync::Arc;

use parking_lot::RwLock;
use tasklist_proto::TaskId;

use crate::api::ApiError;

/// Errors returned by store operations.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request failed; carries the server's message when it sent one.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A list title was empty; nothing was sent.
    #[error("title must not be empty")]
    EmptyTitle,

    /// A task operation needs a current list and there is none.
    #[error("no list is selected")]
    NoCurrentList,

    /// The task is not in the local cache for that list; nothing was sent.
    #[error("task {0} is not in the current list")]
    TaskNotFound(TaskId),

    /// The background fetch task was cancelled or panicked.
    #[error("fetch aborted: {0}")]
    Aborted(String),
}

/// What a fetch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// This call issued the request and it succeeded.
    Fetched,
    /// An identical fetch was already in flight; this call awaited it.
    Joined,
    /// The cache was already loaded and the fetch was not forced.
    Cached,
    /// No session token; nothing was sent.
    NoSession,
    /// No current list to fetch tasks for; nothing was sent.
    NoList,
    /// The request succeeded but the cache was reset while it ran, so the
    /// response was dropped.
    Discarded,
}

impl FetchOutcome {
    /// Whether a request was sent (or awaited) on behalf of this call.
    #[must_use]
    pub const fn hit_network(self) -> bool {
        matches!(self, Self::Fetched | Self::Joined | Self::Discarded)
    }
}

/// Loading counter tagged with the cache epoch.
///
/// Every fetch increments the count and decrements it when it lands. A
/// reset zeroes the count and bumps the epoch, so fetches begun before the
/// reset neither decrement the new count nor write into the cleared cache.
#[derive(Debug, Default)]
pub(crate) struct Loading {
    count: usize,
    epoch: u64,
}

impl Loading {
    fn begin(&mut self) -> u64 {
        self.count += 1;
        self.epoch
    }

    fn end(&mut self, epoch: u64) {
        if self.epoch == epoch {
            self.count = self.count.saturating_sub(1);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.count = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) const fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub(crate) const fn is_loading(&self) -> bool {
        self.count > 0
    }
}

/// Store state that carries a [`Loading`] counter.
pub(crate) trait HasLoading {
    fn loading_mut(&mut self) -> &mut Loading;
}

/// Holds one unit of the loading count until dropped.
pub(crate) struct LoadingGuard<S: HasLoading> {
    state: Arc<RwLock<S>>,
    epoch: u64,
}

impl<S: HasLoading> LoadingGuard<S> {
    pub(crate) fn begin(state: &Arc<RwLock<S>>) -> Self {
        let epoch = state.write().loading_mut().begin();
        Self {
            state: Arc::clone(state),
            epoch,
        }
    }

    /// Epoch the fetch started in.
    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<S: HasLoading> Drop for LoadingGuard<S> {
    fn drop(&mut self) {
        self.state.write().loading_mut().end(self.epoch);
    }
}
