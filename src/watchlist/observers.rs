use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::error;

use super::item::WatchlistItem;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&[WatchlistItem]) + Send + Sync>;

#[derive(Default)]
struct Registry {
  next_id: u64,
  callbacks: Vec<(SubscriptionId, Callback)>,
}

/// Callbacks invoked with the full list after every change.
#[derive(Default)]
pub struct Observers {
  registry: Mutex<Registry>,
}

impl Observers {
  pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
  where
    F: Fn(&[WatchlistItem]) + Send + Sync + 'static,
  {
    let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
    registry.next_id += 1;
    let id = SubscriptionId(registry.next_id);
    let callback: Callback = Arc::new(callback);
    registry.callbacks.push((id, callback));
    id
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
    let before = registry.callbacks.len();
    registry.callbacks.retain(|(existing, _)| *existing != id);
    registry.callbacks.len() != before
  }

  pub fn len(&self) -> usize {
    self
      .registry
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .callbacks
      .len()
  }

  /// Call every subscriber in subscription order.
  ///
  /// Callbacks run outside the registry lock, so they may subscribe or
  /// unsubscribe. A panicking callback is logged and skipped.
  pub fn notify(&self, items: &[WatchlistItem]) {
    let callbacks: Vec<(SubscriptionId, Callback)> = self
      .registry
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .callbacks
      .clone();

    for (id, callback) in callbacks {
      if panic::catch_unwind(AssertUnwindSafe(|| callback(items))).is_err() {
        error!(subscription = ?id, "watchlist observer panicked");
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
  Info,
  Success,
  Error,
}

/// Short user-facing message about an operation's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Info,
      message: message.into(),
    }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Error,
      message: message.into(),
    }
  }
}
