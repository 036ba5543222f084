//! At most one in-flight fetch per cache key.
//!
//! The first caller for a key spawns the fetch onto the runtime and gets a
//! [`Shared`] handle to its result; later callers for the same key get a
//! clone of that handle and await the same request. The fetch runs to
//! completion even if every caller stops waiting, and its entry is removed
//! when the spawned task ends.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use super::StoreError;

/// Cloneable handle to the result of one spawned fetch: `Ok(true)` when the
/// response was written to the cache, `Ok(false)` when a reset made it stale.
pub type SharedFetch = Shared<BoxFuture<'static, Result<bool, StoreError>>>;

/// How a caller got its [`SharedFetch`].
pub enum Flight {
    /// This call spawned the fetch.
    Started(SharedFetch),
    /// A fetch for the key was already running.
    Joined(SharedFetch),
}

struct Flights<K> {
    next_generation: u64,
    entries: HashMap<K, (u64, SharedFetch)>,
}

/// Map from cache key to the fetch currently running for it.
pub struct InFlight<K> {
    flights: Arc<Mutex<Flights<K>>>,
}

impl<K> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(Flights {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<K> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K> std::fmt::Debug for InFlight<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("running", &self.flights.lock().entries.len())
            .finish()
    }
}

impl<K> InFlight<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Joins the fetch running for `key`, or spawns the one `start` builds.
    ///
    /// `start` is only called when nothing is running for `key`. Must be
    /// called from within a tokio runtime.
    pub fn join_or_spawn<F, Fut>(&self, key: K, start: F) -> Flight
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, StoreError>> + Send + 'static,
    {
        let mut flights = self.flights.lock();
        if let Some((_, shared)) = flights.entries.get(&key) {
            return Flight::Joined(shared.clone());
        }

        flights.next_generation += 1;
        let generation = flights.next_generation;
        let landing = Landing {
            flights: Arc::downgrade(&self.flights),
            key: key.clone(),
            generation,
        };

        let fetch = start();
        // The entry is inserted before the lock is released, so the landing
        // cannot run ahead of it.
        let handle = tokio::spawn(async move {
            let _landing = landing;
            fetch.await
        });
        let shared = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(StoreError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        flights.entries.insert(key, (generation, shared.clone()));
        Flight::Started(shared)
    }

    /// Whether a fetch is running for `key`.
    pub fn is_running(&self, key: &K) -> bool {
        self.flights.lock().entries.contains_key(key)
    }

    /// Number of fetches currently running.
    pub fn len(&self) -> usize {
        self.flights.lock().entries.len()
    }

    /// Whether no fetch is running.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes a flight's entry when its task ends, unless a newer flight
/// already took the key.
struct Landing<K: Eq + Hash> {
    flights: Weak<Mutex<Flights<K>>>,
    key: K,
    generation: u64,
}

impl<K: Eq + Hash> Drop for Landing<K> {
    fn drop(&mut self) {
        let Some(flights) = self.flights.upgrade() else {
            return;
        };
        let mut flights = flights.lock();
        if flights
            .entries
            .get(&self.key)
            .is_some_and(|(generation, _)| *generation == self.generation)
        {
            flights.entries.remove(&self.key);
        }
    }
}
