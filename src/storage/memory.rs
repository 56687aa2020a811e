use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{check_quota, KeyValueStore, StorageError};

/// Process-local storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  values: Arc<Mutex<HashMap<String, String>>>,
  quota: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject writes that would push the total stored bytes past `bytes`.
  pub fn with_quota(mut self, bytes: usize) -> Self {
    self.quota = Some(bytes);
    self
  }
}

impl KeyValueStore for MemoryStore {
  fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
    let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(values.get(key).cloned())
  }

  fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
    let others: usize = values
      .iter()
      .filter(|(k, _)| k.as_str() != key)
      .map(|(_, v)| v.len())
      .sum();
    check_quota(self.quota, others, value.len())?;

    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
    values.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_save_load_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.load("k").unwrap(), None);

    store.save("k", "[1]").unwrap();
    assert_eq!(store.load("k").unwrap().as_deref(), Some("[1]"));

    store.remove("k").unwrap();
    store.remove("k").unwrap();
    assert_eq!(store.load("k").unwrap(), None);
  }

  #[test]
  fn test_quota_counts_other_keys() {
    let store = MemoryStore::new().with_quota(10);
    store.save("a", "12345").unwrap();
    // Overwriting a key does not count its old value
    store.save("a", "1234567890").unwrap();

    let err = store.save("b", "x").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { needed: 11, limit: 10 }));
    assert_eq!(store.load("b").unwrap(), None);
  }
}
