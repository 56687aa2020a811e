use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// A persisted key was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
  pub key: String,
  /// Instance that made the write; `None` when it came from another process
  pub origin: Option<u64>,
}

/// Broadcast channel for storage changes shared by every store instance.
#[derive(Debug, Clone)]
pub struct ChangeBus {
  tx: broadcast::Sender<StorageChange>,
}

impl ChangeBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Publish a change. Having no subscribers is not an error.
  pub fn publish(&self, change: StorageChange) {
    let _ = self.tx.send(change);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
    self.tx.subscribe()
  }
}

impl Default for ChangeBus {
  fn default() -> Self {
    Self::new(64)
  }
}

/// Poll `storage` for writes made through other connections and publish
/// them on `bus` with no origin.
///
/// The task runs until aborted.
pub fn spawn_storage_watcher<S>(storage: Arc<S>, bus: ChangeBus, every: Duration) -> JoinHandle<()>
where
  S: KeyValueStore + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;
      match storage.poll_changes() {
        Ok(keys) => {
          for key in keys {
            debug!(key = %key, "external storage change");
            bus.publish(StorageChange { key, origin: None });
          }
        }
        Err(e) => warn!(error = %e, "failed to poll storage changes"),
      }
    }
  })
}
