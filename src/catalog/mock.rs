//! In-memory [`Transport`] for tests.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::CatalogError;
use super::params::QueryParams;
use super::transport::Transport;

#[derive(Default)]
struct MockState {
  responses: HashMap<String, Result<Value, CatalogError>>,
  calls: Vec<(String, QueryParams)>,
}

/// Canned responses keyed by endpoint; records every call.
///
/// Clones share state, so a test can keep a handle after giving one
/// to a client.
#[derive(Clone, Default)]
pub struct MockTransport {
  state: Arc<Mutex<MockState>>,
  delay: Option<Duration>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delay every response, to keep requests in flight.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn respond(&self, endpoint: &str, value: Value) {
    self
      .state
      .lock()
      .unwrap()
      .responses
      .insert(endpoint.to_string(), Ok(value));
  }

  pub fn fail(&self, endpoint: &str, err: CatalogError) {
    self
      .state
      .lock()
      .unwrap()
      .responses
      .insert(endpoint.to_string(), Err(err));
  }

  pub fn calls(&self) -> Vec<(String, QueryParams)> {
    self.state.lock().unwrap().calls.clone()
  }

  pub fn call_count(&self) -> usize {
    self.state.lock().unwrap().calls.len()
  }

  /// Parameters of the most recent call.
  pub fn last_params(&self) -> Option<QueryParams> {
    self.calls().pop().map(|(_, params)| params)
  }
}

impl Transport for MockTransport {
  fn get(&self, endpoint: &str, params: &QueryParams) -> BoxFuture<'static, Result<Value, CatalogError>> {
    let response = {
      let mut state = self.state.lock().unwrap();
      state.calls.push((endpoint.to_string(), params.clone()));
      state
        .responses
        .get(endpoint)
        .cloned()
        .unwrap_or_else(|| {
          Err(CatalogError::Fetch {
            status: Some(404),
            message: format!("no mock for {}", endpoint),
          })
        })
    };
    let delay = self.delay;

    async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      response
    }
    .boxed()
  }
}
