//! Cache layer that orchestrates memoization around a fetcher.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Duration;
use tracing::trace;

use super::traits::{CacheEntry, CacheResult, CacheStats, QueryKey};

/// Default time before an entry is considered expired (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

type PendingFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct CacheState<V, E> {
  entries: HashMap<String, CacheEntry<V>>,
  /// Weak so that a fetch every caller has dropped is not joined later
  in_flight: HashMap<String, WeakShared<BoxFuture<'static, Result<V, E>>>>,
}

impl<V: Clone, E> CacheState<V, E> {
  /// Return a fresh entry, evicting it first if it has expired.
  fn lookup(&mut self, hash: &str, ttl: Duration) -> Option<V> {
    let expired = self.entries.get(hash)?.is_expired(ttl);
    if expired {
      if let Some(entry) = self.entries.remove(hash) {
        trace!(key = %entry.key, "evicted expired cache entry");
      }
      return None;
    }
    self.entries.get(hash).map(|entry| entry.value.clone())
  }
}

/// Cache layer that memoizes fetch results for a fixed TTL.
///
/// Concurrent callers asking for a key that is already being fetched
/// wait on the same pending future instead of issuing their own fetch.
/// Failed fetches are never stored.
pub struct CacheLayer<V, E> {
  state: Arc<Mutex<CacheState<V, E>>>,
  ttl: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V, E> CacheLayer<V, E>
where
  V: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState {
        entries: HashMap::new(),
        in_flight: HashMap::new(),
      })),
      ttl: DEFAULT_TTL,
    }
  }

  /// Set how long a stored value stays valid.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Fetch a value with cache-first strategy.
  ///
  /// 1. Fresh entry: return it without calling `fetcher`
  /// 2. Fetch already pending for the key and still awaited: wait on it
  /// 3. Otherwise call `fetcher`, store the value on success
  ///
  /// Dropping the returned future cancels the fetch once no other caller
  /// is waiting on it.
  pub async fn fetch<K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<V>, E>
  where
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
  {
    let hash = key.cache_hash();

    let (pending, joined) = {
      let mut state = lock(&self.state);

      if let Some(value) = state.lookup(&hash, self.ttl) {
        return Ok(CacheResult::from_cache(value));
      }

      match state.in_flight.get(&hash).and_then(WeakShared::upgrade) {
        Some(pending) => (pending, true),
        None => {
          let pending = self.start(hash.clone(), key.description(), fetcher());
          match pending.downgrade() {
            Some(weak) => {
              state.in_flight.insert(hash, weak);
            }
            None => {
              state.in_flight.remove(&hash);
            }
          }
          (pending, false)
        }
      }
    };

    let data = pending.await?;
    if joined {
      Ok(CacheResult::shared(data))
    } else {
      Ok(CacheResult::from_network(data))
    }
  }

  /// Wrap a fetch so that completing it updates the cache exactly once,
  /// however many callers are waiting on it.
  fn start<Fut>(&self, hash: String, description: String, fetch: Fut) -> PendingFetch<V, E>
  where
    Fut: Future<Output = Result<V, E>> + Send + 'static,
  {
    let state = Arc::clone(&self.state);

    async move {
      let result = fetch.await;

      let mut state = lock(&state);
      state.in_flight.remove(&hash);
      if let Ok(value) = &result {
        state
          .entries
          .insert(hash, CacheEntry::new(description, value.clone()));
      }

      result
    }
    .boxed()
    .shared()
  }

  /// Drop every stored entry. Pending fetches are left running.
  pub fn clear(&self) {
    lock(&self.state).entries.clear();
  }

  /// Number of stored entries and their key descriptions, sorted.
  ///
  /// Expired entries that have not been looked up since are still counted.
  pub fn stats(&self) -> CacheStats {
    let state = lock(&self.state);
    let mut keys: Vec<String> = state
      .entries
      .values()
      .map(|entry| entry.key.clone())
      .collect();
    keys.sort();

    CacheStats {
      size: state.entries.len(),
      keys,
    }
  }
}

impl<V, E> Default for CacheLayer<V, E>
where
  V: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<V, E> Clone for CacheLayer<V, E> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
      ttl: self.ttl,
    }
  }
}
