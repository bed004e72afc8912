//! In-memory query cache that orchestrates caching logic with network fetching.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::api::ApiError;

use super::key::QueryKey;
use super::state::{CacheResult, CacheSource, QueryState};

type AnyValue = Arc<dyn Any + Send + Sync>;
type Fetched = Result<(AnyValue, DateTime<Utc>), ApiError>;
type InFlight = Shared<BoxFuture<'static, Fetched>>;

enum Lookup<T> {
  Hit(CacheResult<T>),
  Join(InFlight),
  Miss,
}

/// Timing knobs for cached reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
  /// How long before cached data is considered stale
  pub stale_time: Duration,
  /// How long an entry may sit unused before it is purged
  pub gc_time: Duration,
}

impl Default for CacheOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(5 * 60),
      gc_time: Duration::from_secs(10 * 60),
    }
  }
}

struct Entry {
  value: Option<AnyValue>,
  fetched_at: Option<(Instant, DateTime<Utc>)>,
  error: Option<ApiError>,
  invalidated: bool,
  /// Ticket identifies which fetch may settle this entry
  in_flight: Option<(u64, InFlight)>,
  last_access: Instant,
}

impl Entry {
  fn new(now: Instant) -> Self {
    Self {
      value: None,
      fetched_at: None,
      error: None,
      invalidated: false,
      in_flight: None,
      last_access: now,
    }
  }

  fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
    match self.fetched_at {
      Some((at, _)) => !self.invalidated && now.duration_since(at) <= stale_time,
      None => false,
    }
  }
}

#[derive(Default)]
struct Store {
  entries: HashMap<QueryKey, Entry>,
  next_ticket: u64,
}

struct Inner {
  store: Mutex<Store>,
  options: CacheOptions,
  collector: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
  /// Record the outcome of fetch `ticket`, unless the entry moved on meanwhile.
  fn settle(&self, key: &QueryKey, ticket: u64, result: &Fetched) {
    let mut store = self.store.lock();
    let Some(entry) = store.entries.get_mut(key) else {
      return;
    };
    if entry.in_flight.as_ref().map(|(t, _)| *t) != Some(ticket) {
      debug!("Discarding superseded result for {}", key);
      return;
    }

    entry.in_flight = None;
    match result {
      Ok((value, fetched_at)) => {
        entry.value = Some(Arc::clone(value));
        entry.fetched_at = Some((Instant::now(), *fetched_at));
        entry.error = None;
        entry.invalidated = false;
      }
      Err(e) => entry.error = Some(e.clone()),
    }
  }

  fn collect_garbage(&self) -> usize {
    let now = Instant::now();
    let gc_time = self.options.gc_time;
    let mut store = self.store.lock();
    let before = store.entries.len();
    store
      .entries
      .retain(|_, e| e.in_flight.is_some() || now.duration_since(e.last_access) <= gc_time);
    before - store.entries.len()
  }
}

impl Drop for Inner {
  fn drop(&mut self) {
    if let Some(handle) = self.collector.get_mut().take() {
      handle.abort();
    }
  }
}

/// Keyed cache of read results.
///
/// Create one at start-up, hand clones to whoever reads or writes, and call
/// [`QueryCache::shutdown`] when done. Clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

impl QueryCache {
  pub fn new(options: CacheOptions) -> Self {
    Self {
      inner: Arc::new(Inner {
        store: Mutex::new(Store::default()),
        options,
        collector: Mutex::new(None),
      }),
    }
  }

  pub fn options(&self) -> CacheOptions {
    self.inner.options
  }

  /// Read through the cache.
  ///
  /// 1. Fresh entry: return it, `fetcher` is never called
  /// 2. A fetch for `key` already running: wait for that one instead
  /// 3. Otherwise run `fetcher` on its own task and store its result
  ///
  /// A failure is recorded on the entry (keeping the last good value) and returned.
  /// The store lock is not held while `fetcher` runs, so it may use this cache.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let (in_flight, source) = match self.lookup::<T>(key) {
      Lookup::Hit(hit) => return Ok(hit),
      Lookup::Join(running) => (running, CacheSource::Shared),
      Lookup::Miss => {
        let fut = fetcher();

        // Someone may have started or finished a fetch while the lock was released
        let mut guard = self.inner.store.lock();
        let store = &mut *guard;
        match self.lookup_locked::<T>(store, key) {
          Lookup::Hit(hit) => return Ok(hit),
          Lookup::Join(running) => (running, CacheSource::Shared),
          Lookup::Miss => {
            let ticket = store.next_ticket;
            store.next_ticket += 1;
            debug!("Fetching {}", key);
            let running = self.spawn_fetch(key.clone(), ticket, fut);
            if let Some(entry) = store.entries.get_mut(key) {
              entry.in_flight = Some((ticket, running.clone()));
            }
            (running, CacheSource::Network)
          }
        }
      }
    };

    let (value, fetched_at) = in_flight.await?;
    let data = downcast::<T>(&Some(value)).ok_or_else(|| ApiError::RequestSetup {
      message: format!("cached value for {} has an unexpected type", key),
    })?;

    Ok(CacheResult {
      data,
      source,
      fetched_at,
    })
  }

  fn lookup<T>(&self, key: &QueryKey) -> Lookup<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let mut store = self.inner.store.lock();
    self.lookup_locked(&mut store, key)
  }

  fn lookup_locked<T>(&self, store: &mut Store, key: &QueryKey) -> Lookup<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let now = Instant::now();
    let entry = store
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));
    entry.last_access = now;

    if entry.is_fresh(self.inner.options.stale_time, now) {
      if let (Some(data), Some((_, fetched_at))) = (downcast::<T>(&entry.value), entry.fetched_at) {
        debug!("Cache hit for {}", key);
        return Lookup::Hit(CacheResult {
          data,
          source: CacheSource::Cache,
          fetched_at,
        });
      }
    }

    match &entry.in_flight {
      Some((_, running)) => {
        debug!("Joining in-flight request for {}", key);
        Lookup::Join(running.clone())
      }
      None => Lookup::Miss,
    }
  }

  fn spawn_fetch<T, Fut>(&self, key: QueryKey, ticket: u64, fut: Fut) -> InFlight
  where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    // The task settles its own entry, so the result lands even if every
    // caller stops waiting.
    let inner = Arc::clone(&self.inner);
    let task = tokio::spawn(async move {
      let result: Fetched = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(fetched) => fetched.map(|value| (Arc::new(value) as AnyValue, Utc::now())),
        Err(_) => Err(ApiError::RequestSetup {
          message: format!("fetch for {} panicked", key),
        }),
      };
      inner.settle(&key, ticket, &result);
      result
    });

    task
      .map(|joined| {
        joined.unwrap_or_else(|e| {
          Err(ApiError::RequestSetup {
            message: format!("fetch task failed: {}", e),
          })
        })
      })
      .boxed()
      .shared()
  }

  /// Snapshot of the read at `key`.
  pub fn state<T>(&self, key: &QueryKey) -> QueryState<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let now = Instant::now();
    let mut store = self.inner.store.lock();
    let Some(entry) = store.entries.get_mut(key) else {
      return QueryState::Idle;
    };
    entry.last_access = now;

    let data = downcast::<T>(&entry.value);
    if entry.in_flight.is_some() {
      return QueryState::Loading { previous: data };
    }
    if let Some(error) = &entry.error {
      return QueryState::Error {
        error: error.clone(),
        previous: data,
      };
    }

    match (data, entry.fetched_at) {
      (Some(data), Some((_, fetched_at))) if entry.is_fresh(self.inner.options.stale_time, now) => {
        QueryState::Success { data, fetched_at }
      }
      (Some(data), Some((_, fetched_at))) => QueryState::Stale { data, fetched_at },
      _ => QueryState::Idle,
    }
  }

  /// Store `value` at `key` as freshly fetched, replacing whatever was there.
  pub fn set_data<T>(&self, key: &QueryKey, value: T)
  where
    T: Send + Sync + 'static,
  {
    let now = Instant::now();
    let mut store = self.inner.store.lock();
    let entry = store
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(now));

    entry.value = Some(Arc::new(value));
    entry.fetched_at = Some((now, Utc::now()));
    entry.error = None;
    entry.invalidated = false;
    entry.in_flight = None;
    entry.last_access = now;
    debug!("Overwrote {}", key);
  }

  /// Mark every entry under `prefix` stale so the next read refetches.
  ///
  /// Requests already in flight still resolve for their callers, but their
  /// results no longer land in the cache.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut store = self.inner.store.lock();
    let mut count = 0;
    for (key, entry) in store.entries.iter_mut() {
      if prefix.matches(key) {
        entry.invalidated = true;
        entry.in_flight = None;
        count += 1;
      }
    }
    debug!("Invalidated {} entries under {}", count, prefix);
    count
  }

  /// Drop every entry under `prefix`.
  pub fn remove(&self, prefix: &QueryKey) -> usize {
    let mut store = self.inner.store.lock();
    let before = store.entries.len();
    store.entries.retain(|key, _| !prefix.matches(key));
    let removed = before - store.entries.len();
    debug!("Removed {} entries under {}", removed, prefix);
    removed
  }

  /// Purge entries unused for longer than the gc time. Returns how many went.
  pub fn collect_garbage(&self) -> usize {
    let purged = self.inner.collect_garbage();
    if purged > 0 {
      debug!("Purged {} idle cache entries", purged);
    }
    purged
  }

  /// Run [`QueryCache::collect_garbage`] every `period` until shutdown.
  pub fn spawn_collector(&self, period: Duration) {
    let weak: Weak<Inner> = Arc::downgrade(&self.inner);
    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
          break;
        };
        inner.collect_garbage();
      }
    });

    if let Some(previous) = self.inner.collector.lock().replace(handle) {
      previous.abort();
    }
  }

  pub fn len(&self) -> usize {
    self.inner.store.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Stop the collector and drop every entry.
  pub fn shutdown(&self) {
    if let Some(handle) = self.inner.collector.lock().take() {
      handle.abort();
    }
    let mut store = self.inner.store.lock();
    let count = store.entries.len();
    store.entries.clear();
    info!("Query cache shut down, dropped {} entries", count);
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("options", &self.inner.options)
      .field("entries", &self.len())
      .finish_non_exhaustive()
  }
}

fn downcast<T: Clone + 'static>(value: &Option<AnyValue>) -> Option<T> {
  value.as_ref().and_then(|v| v.downcast_ref::<T>()).cloned()
}
