//! Core traits and types for the caching system.

use serde::Serialize;
use tokio::time::{Duration, Instant};

/// Trait for keys that identify a cacheable request.
///
/// Implementors provide a stable hash for lookups and a readable
/// description for diagnostics.
pub trait QueryKey {
  /// Fixed-length hash used as the storage key
  fn cache_hash(&self) -> String;

  /// Human readable form of the key (e.g., "/movie/42?page=1")
  fn description(&self) -> String;
}

/// A memoized value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
  /// Description of the key this entry was stored under
  pub key: String,
  pub value: V,
  pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
  pub fn new(key: String, value: V) -> Self {
    Self {
      key,
      value,
      stored_at: Instant::now(),
    }
  }

  /// An entry is expired once its age reaches the TTL.
  pub fn is_expired(&self, ttl: Duration) -> bool {
    self.stored_at.elapsed() >= ttl
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn shared(data: T) -> Self {
    Self {
      data,
      source: CacheSource::InFlight,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This call performed the fetch
  Network,
  /// A fresh cache entry was returned without fetching
  Cache,
  /// Joined a fetch another caller had already started
  InFlight,
}

/// Snapshot of the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub size: usize,
  pub keys: Vec<String>,
}
