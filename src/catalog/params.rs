//! Query parameters and the cache key derived from them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::cache::QueryKey;

/// Query string parameters for a catalog request.
///
/// Kept sorted by name so the same parameter set always serializes the
/// same way, whatever order it was built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parameters holding just a page number.
  pub fn page(page: u32) -> Self {
    Self::new().with("page", page)
  }

  pub fn with(mut self, key: &str, value: impl ToString) -> Self {
    self.insert(key, value);
    self
  }

  /// Add the parameter only when a value is present.
  pub fn with_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
    if let Some(value) = value {
      self.insert(key, value);
    }
    self
  }

  pub fn insert(&mut self, key: &str, value: impl ToString) {
    self.0.insert(key.to_string(), value.to_string());
  }

  #[cfg(test)]
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// URL-encoded `k=v&k=v` form.
  pub fn to_query_string(&self) -> String {
    url::form_urlencoded::Serializer::new(String::new())
      .extend_pairs(self.iter())
      .finish()
  }
}

/// Cache key for a catalog request: the endpoint plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
  pub endpoint: String,
  pub params: QueryParams,
}

impl RequestKey {
  pub fn new(endpoint: &str, params: QueryParams) -> Self {
    Self {
      endpoint: endpoint.to_string(),
      params,
    }
  }
}

impl QueryKey for RequestKey {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.description().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    if self.params.is_empty() {
      self.endpoint.clone()
    } else {
      format!("{}?{}", self.endpoint, self.params.to_query_string())
    }
  }
}
