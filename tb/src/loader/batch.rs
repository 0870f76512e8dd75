//! Batched loader: coalesces single-key lookups into bulk fetches
//!
//! Keys requested within one short window are sent to the backing
//! [`BatchFn`] in a single call. Each key is fetched at most once per loader;
//! later requests for it, including ones made while the fetch is still in
//! flight, share the same result.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Default debounce window
pub const DEFAULT_WAIT: Duration = Duration::from_millis(1);

/// Default largest batch sent to the backing fetch
pub const DEFAULT_MAX_BATCH: usize = 100;

/// Errors surfaced by [`Loader::load`]
///
/// Cloneable so one failed fetch reaches every waiting caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Batch fetch failed: {0}")]
    Fetch(Arc<dyn std::error::Error + Send + Sync>),

    #[error("Batch dispatch was cancelled")]
    Cancelled,
}

impl LoadError {
    /// Wrap a backing-store error
    pub fn fetch(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        LoadError::Fetch(Arc::new(err))
    }
}

/// Outcome of one key: `Ok(None)` when the backing store has no such row
pub type LoadResult<V> = Result<Option<V>, LoadError>;

/// Bulk fetch backing a [`Loader`]
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync + 'static {
    /// Fetch `keys` (already deduplicated); the result is aligned with `keys`
    async fn load(&self, keys: &[K]) -> Result<Vec<Option<V>>, LoadError>;
}

type Slot<V> = Shared<BoxFuture<'static, LoadResult<V>>>;

struct Window<K, V> {
    id: u64,
    /// Distinct keys, in arrival order
    keys: Vec<K>,
    /// Callers per key, aligned with `keys`
    waiters: Vec<Vec<oneshot::Sender<LoadResult<V>>>>,
}

struct State<K, V> {
    /// Every key this loader has seen, resolved or in flight
    cache: HashMap<K, Slot<V>>,
    /// Window currently accumulating keys
    window: Option<Window<K, V>>,
    next_window: u64,
}

struct Inner<K, V> {
    name: &'static str,
    fetch: Arc<dyn BatchFn<K, V>>,
    wait: Duration,
    max_batch: usize,
    state: Mutex<State<K, V>>,
    dispatches: AtomicU64,
}

/// Per-request cache-and-batch loader
///
/// Cheap to clone; clones share the cache and the open window.
pub struct Loader<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Loader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Loader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a loader with the default window and batch size
    pub fn new(name: &'static str, fetch: impl BatchFn<K, V>) -> Self {
        Self::with_options(name, fetch, DEFAULT_WAIT, DEFAULT_MAX_BATCH)
    }

    /// Create a loader; `max_batch` is raised to at least 1
    pub fn with_options(name: &'static str, fetch: impl BatchFn<K, V>, wait: Duration, max_batch: usize) -> Self {
        debug!(loader = name, ?wait, max_batch, "Loader::new: called");
        Self {
            inner: Arc::new(Inner {
                name,
                fetch: Arc::new(fetch),
                wait,
                max_batch: max_batch.max(1),
                state: Mutex::new(State {
                    cache: HashMap::new(),
                    window: None,
                    next_window: 0,
                }),
                dispatches: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Number of bulk fetches issued so far
    pub fn dispatch_count(&self) -> u64 {
        self.inner.dispatches.load(Ordering::Relaxed)
    }

    /// Load one key, waiting for the batch that carries it
    ///
    /// Must be called inside a tokio runtime.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        let slot = self.slot(key);
        slot.await
    }

    /// Load several keys in the same window; results follow `keys` order
    pub async fn load_many(&self, keys: &[K]) -> Vec<LoadResult<V>> {
        let slots: Vec<Slot<V>> = keys.iter().cloned().map(|key| self.slot(key)).collect();
        join_all(slots).await
    }

    /// Seed the cache with a known value; an existing entry wins
    pub fn prime(&self, key: K, value: V) {
        let mut state = self.inner.lock();
        state
            .cache
            .entry(key)
            .or_insert_with(|| futures::future::ready(Ok(Some(value))).boxed().shared());
    }

    /// Forget a cached key so the next load fetches it again
    ///
    /// A key still waiting in the open window stays queued once; a later
    /// load of it shares that pending fetch.
    pub fn clear(&self, key: &K) -> bool {
        self.inner.lock().cache.remove(key).is_some()
    }

    /// Forget every cached key
    pub fn clear_all(&self) {
        self.inner.lock().cache.clear();
    }

    /// Cached slot for `key`, or a new one queued in the open window
    fn slot(&self, key: K) -> Slot<V> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        if let Some(slot) = state.cache.get(&key) {
            debug!(loader = self.inner.name, ?key, "Loader::load: cache hit");
            return slot.clone();
        }

        let (tx, rx) = oneshot::channel();
        let slot: Slot<V> = async move { rx.await.unwrap_or(Err(LoadError::Cancelled)) }
            .boxed()
            .shared();
        state.cache.insert(key.clone(), slot.clone());

        let mut opened = None;
        let window = state.window.get_or_insert_with(|| {
            let id = state.next_window;
            state.next_window += 1;
            opened = Some(id);
            Window {
                id,
                keys: Vec::new(),
                waiters: Vec::new(),
            }
        });
        // A key cleared from the cache while still queued joins its existing entry
        match window.keys.iter().position(|k| *k == key) {
            Some(index) => window.waiters[index].push(tx),
            None => {
                window.keys.push(key);
                window.waiters.push(vec![tx]);
            }
        }
        let full = window.keys.len() >= self.inner.max_batch;
        let ready = if full { state.window.take() } else { None };
        drop(guard);

        if let Some(id) = opened {
            Inner::schedule(&self.inner, id);
        }
        if let Some(window) = ready {
            debug!(loader = self.inner.name, window = window.id, "Loader::load: batch full, dispatching now");
            tokio::spawn(Inner::dispatch(Arc::clone(&self.inner), window));
        }
        slot
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close window `id` after the debounce delay unless it was already dispatched
    fn schedule(inner: &Arc<Self>, id: u64) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.wait).await;
            let window = {
                let mut guard = inner.lock();
                let state = &mut *guard;
                if state.window.as_ref().is_some_and(|w| w.id == id) {
                    state.window.take()
                } else {
                    None
                }
            };
            if let Some(window) = window {
                Inner::dispatch(inner, window).await;
            }
        });
    }

    async fn dispatch(inner: Arc<Self>, window: Window<K, V>) {
        let Window { id, keys, waiters } = window;
        inner.dispatches.fetch_add(1, Ordering::Relaxed);
        debug!(loader = inner.name, window = id, keys = keys.len(), "Loader::dispatch: fetching batch");

        match inner.fetch.load(&keys).await {
            Ok(values) => {
                if values.len() != keys.len() {
                    warn!(
                        loader = inner.name,
                        window = id,
                        expected = keys.len(),
                        got = values.len(),
                        "Loader::dispatch: fetch result not aligned with keys"
                    );
                }
                let mut values = values.into_iter();
                for callers in waiters {
                    let value = values.next().flatten();
                    for waiter in callers {
                        // A waiter with no caller left is fine to skip
                        let _ = waiter.send(Ok(value.clone()));
                    }
                }
            }
            Err(err) => {
                warn!(loader = inner.name, window = id, error = %err, "Loader::dispatch: fetch failed");
                for waiter in waiters.into_iter().flatten() {
                    let _ = waiter.send(Err(err.clone()));
                }
            }
        }
    }
}
