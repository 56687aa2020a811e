//! Catalog client with transparent response caching.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheLayer, CacheStats, QueryKey};
use crate::config::CatalogConfig;

use super::error::CatalogError;
use super::images::ImageUrls;
use super::models::MovieDetails;
use super::params::{QueryParams, RequestKey};
use super::transport::{HttpTransport, Transport};

/// Single point of access to the remote catalog.
///
/// Every call goes through [`CatalogClient::request`], which attaches
/// nothing itself (the transport adds credentials) but memoizes
/// successful responses for the configured TTL and bounds each network
/// call with a timeout.
pub struct CatalogClient<T = HttpTransport> {
  transport: Arc<T>,
  cache: CacheLayer<Value, CatalogError>,
  timeout: Duration,
  images: ImageUrls,
}

impl CatalogClient<HttpTransport> {
  pub fn new(config: &CatalogConfig, api_key: String) -> Result<Self, CatalogError> {
    let transport = HttpTransport::new(config, api_key)?;
    Ok(Self::with_transport(transport, config))
  }
}

impl<T: Transport> CatalogClient<T> {
  pub fn with_transport(transport: T, config: &CatalogConfig) -> Self {
    Self {
      transport: Arc::new(transport),
      cache: CacheLayer::new().with_ttl(config.cache_ttl()),
      timeout: config.timeout(),
      images: ImageUrls::new(config.image_base_url.clone()),
    }
  }

  /// Perform a GET against `endpoint`, serving a fresh cached response
  /// when there is one.
  pub async fn request(&self, endpoint: &str, params: QueryParams) -> Result<Value, CatalogError> {
    let key = RequestKey::new(endpoint, params);

    let result = self
      .cache
      .fetch(&key, || {
        let fetch = self.transport.get(&key.endpoint, &key.params);
        let timeout = self.timeout;
        async move {
          match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout(timeout)),
          }
        }
      })
      .await;

    match result {
      Ok(result) => {
        debug!(request = %key.description(), source = ?result.source, "catalog response");
        Ok(result.data)
      }
      Err(e) => {
        warn!(request = %key.description(), error = %e, "catalog request failed");
        Err(e)
      }
    }
  }

  /// Like [`request`](Self::request), decoding the response into `D`.
  pub async fn request_as<D: DeserializeOwned>(
    &self,
    endpoint: &str,
    params: QueryParams,
  ) -> Result<D, CatalogError> {
    let value = self.request(endpoint, params).await?;
    serde_json::from_value(value)
      .map_err(|e| CatalogError::Decode(format!("{}: {}", endpoint, e)))
  }

  /// Issue every request concurrently. Never fails as a whole: each
  /// member gets its own outcome, in input order.
  pub async fn batch_requests(&self, requests: Vec<BatchRequest>) -> Vec<BatchOutcome> {
    let results = join_all(
      requests
        .iter()
        .map(|r| self.request(&r.endpoint, r.params.clone())),
    )
    .await;

    requests
      .into_iter()
      .zip(results)
      .map(|(request, result)| match result {
        Ok(data) => BatchOutcome {
          request,
          success: true,
          data: Some(data),
          error: None,
        },
        Err(e) => BatchOutcome {
          request,
          success: false,
          data: None,
          error: Some(e.to_string()),
        },
      })
      .collect()
  }

  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  pub fn cache_stats(&self) -> CacheStats {
    self.cache.stats()
  }

  pub fn images(&self) -> &ImageUrls {
    &self.images
  }
}

/// Reject blank search input before any I/O.
pub(crate) fn require_query(query: &str) -> Result<(), CatalogError> {
  if query.trim().is_empty() {
    return Err(CatalogError::Validation(
      "Search query cannot be empty".to_string(),
    ));
  }
  Ok(())
}

/// One member of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
  pub endpoint: String,
  #[serde(default)]
  pub params: QueryParams,
}

/// Outcome of one batch member.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
  pub request: BatchRequest,
  pub success: bool,
  pub data: Option<Value>,
  pub error: Option<String>,
}

/// The slice of the catalog the watchlist depends on.
pub trait CatalogLookup: Send + Sync {
  /// Full detail record for a movie.
  fn fetch_details(&self, id: i64) -> BoxFuture<'_, Result<MovieDetails, CatalogError>>;
}

impl<T: Transport> CatalogLookup for CatalogClient<T> {
  fn fetch_details(&self, id: i64) -> BoxFuture<'_, Result<MovieDetails, CatalogError>> {
    self.movie_details(id).boxed()
  }
}
