use std::time::Duration;

use thiserror::Error;

/// Errors returned by the catalog client.
///
/// Cloneable so a single failed request can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
  /// Bad caller input, raised before any network I/O
  #[error("{0}")]
  Validation(String),

  /// Non-success HTTP status, or the transport failed before a response arrived
  #[error("failed to fetch data{}: {message}", status_suffix(.status))]
  Fetch {
    status: Option<u16>,
    message: String,
  },

  #[error("catalog request timed out after {0:?}")]
  Timeout(Duration),

  /// The response body did not have the expected shape
  #[error("unexpected catalog response: {0}")]
  Decode(String),
}

fn status_suffix(status: &Option<u16>) -> String {
  status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CatalogError {
  pub fn transport(err: impl std::fmt::Display) -> Self {
    Self::Fetch {
      status: None,
      message: err.to_string(),
    }
  }

  /// HTTP status of a failed response, if there was one.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Fetch { status, .. } => *status,
      _ => None,
    }
  }
}
