//! Durable key/value storage for local app state.
//!
//! Values are JSON text stored under string keys, one key per operation.
//! Writes can fail (e.g., quota exceeded) and callers are expected to
//! keep working from their in-memory state when they do.

#[cfg(test)]
mod memory;
mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
  QuotaExceeded { needed: usize, limit: usize },

  #[error("failed to encode value for {key}: {message}")]
  Encode { key: String, message: String },

  #[error("storage backend error: {0}")]
  Backend(String),
}

/// Trait for key/value storage backends.
pub trait KeyValueStore: Send + Sync {
  /// Raw value stored under `key`, if any.
  fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Store `value` under `key`, replacing any previous value.
  fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Delete `key`. Deleting a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StorageError>;

  /// Keys written by someone other than this handle since the last call.
  ///
  /// Backends that cannot be shared between processes report nothing.
  fn poll_changes(&self) -> Result<Vec<String>, StorageError> {
    Ok(Vec::new())
  }
}

/// Check a write of `new_len` bytes against an optional quota, given the
/// bytes already used by every other key.
fn check_quota(quota: Option<usize>, others: usize, new_len: usize) -> Result<(), StorageError> {
  match quota {
    Some(limit) if others + new_len > limit => Err(StorageError::QuotaExceeded {
      needed: others + new_len,
      limit,
    }),
    _ => Ok(()),
  }
}
