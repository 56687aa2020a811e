use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogLookup;
use crate::event::{ChangeBus, StorageChange};
use crate::storage::{KeyValueStore, StorageError};

use super::error::WatchlistError;
use super::item::{ItemUpdate, WatchlistItem, RATING_RANGE};
use super::observers::{Notice, Observers, SubscriptionId};
use super::query::{self, FilterCriteria, SortKey, SortOrder};
use super::snapshot::{self, Backup, Snapshot, FORMAT_VERSION};
use super::stats::WatchlistStats;

pub const DEFAULT_STORAGE_KEY: &str = "cineverse_watchlist";

const NOTICE_CAPACITY: usize = 32;

/// Distinguishes this process's store instances on the change bus.
static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
  pub refreshed: usize,
  pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
  /// Size of the serialized list
  pub bytes: usize,
  pub items: usize,
}

/// The saved list, mirrored to a storage key.
///
/// The in-memory list is authoritative for the session. Every mutation
/// is applied to a copy, persisted, and only then swapped in, so a
/// failed write leaves the list as it was. Successful writes are
/// announced on the change bus and to every observer.
pub struct WatchlistStore<C, S> {
  catalog: Arc<C>,
  storage: Arc<S>,
  bus: ChangeBus,
  origin: u64,
  key: String,
  backup_key: String,
  items: Mutex<Vec<WatchlistItem>>,
  observers: Observers,
  notices: broadcast::Sender<Notice>,
}

impl<C: CatalogLookup, S: KeyValueStore> WatchlistStore<C, S> {
  pub fn new(catalog: Arc<C>, storage: Arc<S>, bus: ChangeBus) -> Self {
    Self::with_storage_key(catalog, storage, bus, DEFAULT_STORAGE_KEY)
  }

  /// Store persisted under `key`; the backup lives under `<key>_backup`.
  pub fn with_storage_key(catalog: Arc<C>, storage: Arc<S>, bus: ChangeBus, key: &str) -> Self {
    let items = match read_items(storage.as_ref(), key) {
      Ok(items) => items,
      Err(e) => {
        warn!(key = %key, error = %e, "could not load watchlist, starting empty");
        Vec::new()
      }
    };
    debug!(key = %key, count = items.len(), "loaded watchlist");

    let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
    Self {
      catalog,
      storage,
      bus,
      origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
      key: key.to_string(),
      backup_key: format!("{}_backup", key),
      items: Mutex::new(items),
      observers: Observers::default(),
      notices,
    }
  }

  fn lock(&self) -> MutexGuard<'_, Vec<WatchlistItem>> {
    self.items.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn notice(&self, notice: Notice) {
    let _ = self.notices.send(notice);
  }

  /// Apply `mutate` to a copy of the list and persist it.
  ///
  /// `mutate` returns `None` when it changed nothing; then nothing is
  /// written or announced. On a storage failure the list is untouched.
  fn commit<R>(
    &self,
    mutate: impl FnOnce(&mut Vec<WatchlistItem>) -> Option<R>,
  ) -> Result<Option<R>, WatchlistError> {
    let (result, snapshot) = {
      let mut items = self.lock();
      let mut next = items.clone();
      let Some(result) = mutate(&mut next) else {
        return Ok(None);
      };

      if let Err(e) = write_items(self.storage.as_ref(), &self.key, &next) {
        error!(key = %self.key, error = %e, "failed to persist watchlist");
        self.notice(Notice::error(format!("Could not save your watchlist: {}", e)));
        return Err(e.into());
      }

      *items = next;
      (result, items.clone())
    };

    self.bus.publish(StorageChange {
      key: self.key.clone(),
      origin: Some(self.origin),
    });
    self.observers.notify(&snapshot);
    Ok(Some(result))
  }

  /// Snapshot of the list, most recently added first.
  pub fn items(&self) -> Vec<WatchlistItem> {
    self.lock().clone()
  }

  pub fn get_item(&self, id: i64) -> Option<WatchlistItem> {
    self.lock().iter().find(|i| i.id == id).cloned()
  }

  pub fn is_present(&self, id: i64) -> bool {
    self.lock().iter().any(|i| i.id == id)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Fetch the movie's details and put it at the top of the list.
  ///
  /// Returns `false` if the movie is already saved.
  pub async fn add(&self, id: i64) -> Result<bool, WatchlistError> {
    if self.is_present(id) {
      self.notice(Notice::info("Already in your watchlist"));
      return Ok(false);
    }

    let details = match self.catalog.fetch_details(id).await {
      Ok(details) => details,
      Err(e) => {
        self.notice(Notice::error(format!("Failed to add movie {}: {}", id, e)));
        return Err(e.into());
      }
    };

    let item = WatchlistItem::from_details(&details, Utc::now());
    let title = item.title.clone();
    let added = self.commit(|items| {
      // Another add may have finished while the details were in flight
      if items.iter().any(|i| i.id == id) {
        return None;
      }
      items.insert(0, item);
      Some(())
    })?;

    if added.is_none() {
      self.notice(Notice::info("Already in your watchlist"));
      return Ok(false);
    }

    info!(id, title = %title, "added to watchlist");
    self.notice(Notice::success(format!("Added \"{}\" to your watchlist", title)));
    Ok(true)
  }

  pub fn remove(&self, id: i64) -> Result<bool, WatchlistError> {
    let removed = self.commit(|items| {
      let index = items.iter().position(|i| i.id == id)?;
      Some(items.remove(index))
    })?;

    match removed {
      Some(item) => {
        info!(id, "removed from watchlist");
        self.notice(Notice::success(format!("Removed \"{}\" from your watchlist", item.title)));
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Merge the fields set in `update` into the item.
  pub fn update(&self, id: i64, update: ItemUpdate) -> Result<bool, WatchlistError> {
    if let Some(Some(rating)) = update.rating {
      validate_rating(i64::from(rating))?;
    }
    if update.is_empty() {
      return Ok(self.is_present(id));
    }

    let updated = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      update.apply(item, Utc::now());
      Some(())
    })?;
    Ok(updated.is_some())
  }

  /// Flip the watched flag. Returns the new state, `None` if not saved.
  pub fn toggle_watched(&self, id: i64) -> Result<Option<bool>, WatchlistError> {
    let watched = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      item.watched = !item.watched;
      item.watched_at = item.watched.then(Utc::now);
      Some(item.watched)
    })?;

    if let Some(watched) = watched {
      let message = if watched { "Marked as watched" } else { "Marked as unwatched" };
      self.notice(Notice::success(message));
    }
    Ok(watched)
  }

  /// Flip the favorite flag. Returns the new state, `None` if not saved.
  pub fn toggle_favorite(&self, id: i64) -> Result<Option<bool>, WatchlistError> {
    let favorite = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      item.favorite = !item.favorite;
      Some(item.favorite)
    })?;

    if let Some(favorite) = favorite {
      let message = if favorite { "Added to favorites" } else { "Removed from favorites" };
      self.notice(Notice::success(message));
    }
    Ok(favorite)
  }

  /// Set the user's rating, 1 to 10 inclusive.
  pub fn rate(&self, id: i64, rating: i64) -> Result<bool, WatchlistError> {
    let rating = validate_rating(rating)?;

    let rated = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      item.rating = Some(rating);
      item.rated_at = Some(Utc::now());
      Some(())
    })?;

    if rated.is_some() {
      self.notice(Notice::success(format!("Rated {}/10", rating)));
    }
    Ok(rated.is_some())
  }

  pub fn add_notes(&self, id: i64, notes: &str) -> Result<bool, WatchlistError> {
    let saved = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      item.notes = notes.to_string();
      item.notes_updated_at = Some(Utc::now());
      Some(())
    })?;

    if saved.is_some() {
      self.notice(Notice::success("Notes saved"));
    }
    Ok(saved.is_some())
  }

  /// Re-fetch one item's catalog fields. Returns `false` if not saved.
  pub async fn refresh(&self, id: i64) -> Result<bool, WatchlistError> {
    if !self.is_present(id) {
      return Ok(false);
    }

    let details = self.catalog.fetch_details(id).await?;
    let refreshed = self.commit(|items| {
      let item = items.iter_mut().find(|i| i.id == id)?;
      item.apply_details(&details, Utc::now());
      Some(())
    })?;
    Ok(refreshed.is_some())
  }

  /// Re-fetch every item concurrently.
  ///
  /// Items whose fetch fails keep their current data. Only a storage
  /// failure fails the whole call.
  pub async fn refresh_all(&self) -> Result<RefreshSummary, WatchlistError> {
    let ids: Vec<i64> = self.lock().iter().map(|i| i.id).collect();
    let results = join_all(ids.iter().map(|&id| self.catalog.fetch_details(id))).await;

    let mut fresh = HashMap::new();
    let mut failed = 0;
    for (id, result) in ids.into_iter().zip(results) {
      match result {
        Ok(details) => {
          fresh.insert(id, details);
        }
        Err(e) => {
          warn!(id, error = %e, "failed to refresh watchlist item");
          failed += 1;
        }
      }
    }

    let refreshed = self
      .commit(|items| {
        if fresh.is_empty() {
          return None;
        }
        let now = Utc::now();
        let mut count = 0;
        for item in items.iter_mut() {
          if let Some(details) = fresh.get(&item.id) {
            item.apply_details(details, now);
            count += 1;
          }
        }
        Some(count)
      })?
      .unwrap_or(0);

    info!(refreshed, failed, "refreshed watchlist");
    self.notice(Notice::success(format!("Refreshed {} movies", refreshed)));
    Ok(RefreshSummary { refreshed, failed })
  }

  pub fn search(&self, query: &str) -> Vec<WatchlistItem> {
    query::search(&self.lock(), query).into_iter().cloned().collect()
  }

  pub fn filter(&self, criteria: &FilterCriteria) -> Vec<WatchlistItem> {
    query::filter(&self.lock(), criteria).into_iter().cloned().collect()
  }

  /// Sorted copy of the list; the stored order is unchanged.
  pub fn sort(&self, key: SortKey, order: SortOrder) -> Vec<WatchlistItem> {
    let mut items = self.items();
    query::sort(&mut items, key, order);
    items
  }

  pub fn stats(&self) -> WatchlistStats {
    WatchlistStats::compute(&self.lock())
  }

  pub fn export_snapshot(&self) -> Snapshot {
    Snapshot::new(self.items(), Utc::now())
  }

  pub fn export_json(&self) -> Result<String, WatchlistError> {
    serde_json::to_string_pretty(&self.export_snapshot())
      .map_err(|e| WatchlistError::Format(e.to_string()))
  }

  /// Append items from an exported document whose ids are not saved yet.
  /// Saved items are never overwritten. Returns how many were added.
  pub fn import_snapshot(&self, payload: &str) -> Result<usize, WatchlistError> {
    let incoming = match snapshot::parse_import(payload) {
      Ok(incoming) => incoming,
      Err(e) => {
        self.notice(Notice::error(format!("Import failed: {}", e)));
        return Err(e);
      }
    };

    let imported = self
      .commit(|items| {
        let mut known: HashSet<i64> = items.iter().map(|i| i.id).collect();
        let before = items.len();
        items.extend(incoming.into_iter().filter(|i| known.insert(i.id)));
        let added = items.len() - before;
        (added > 0).then_some(added)
      })?
      .unwrap_or(0);

    info!(imported, "imported watchlist");
    if imported > 0 {
      self.notice(Notice::success(format!("Imported {} movies", imported)));
    } else {
      self.notice(Notice::info("No new movies to import"));
    }
    Ok(imported)
  }

  /// Copy the current list to the backup slot.
  pub fn backup(&self) -> Result<(), WatchlistError> {
    let backup = Backup {
      timestamp: Utc::now(),
      version: FORMAT_VERSION.to_string(),
      wishlist: self.items(),
    };
    let count = backup.wishlist.len();

    let saved = serde_json::to_string(&backup)
      .map_err(|e| StorageError::Encode {
        key: self.backup_key.clone(),
        message: e.to_string(),
      })
      .and_then(|json| self.storage.save(&self.backup_key, &json));

    if let Err(e) = saved {
      error!(key = %self.backup_key, error = %e, "failed to write backup");
      self.notice(Notice::error(format!("Backup failed: {}", e)));
      return Err(e.into());
    }

    self.bus.publish(StorageChange {
      key: self.backup_key.clone(),
      origin: Some(self.origin),
    });
    info!(count, "backed up watchlist");
    self.notice(Notice::success("Backup created"));
    Ok(())
  }

  /// Replace the list with the backup. Returns `false` if there is none.
  pub fn restore(&self) -> Result<bool, WatchlistError> {
    let Some(raw) = self.storage.load(&self.backup_key)? else {
      self.notice(Notice::error("No backup found"));
      return Ok(false);
    };

    let backup: Backup = serde_json::from_str(&raw)
      .map_err(|e| WatchlistError::Format(format!("corrupt backup: {}", e)))?;
    let count = backup.wishlist.len();
    self.commit(|items| {
      *items = backup.wishlist;
      Some(())
    })?;

    info!(count, taken = %backup.timestamp, "restored watchlist backup");
    self.notice(Notice::success("Watchlist restored from backup"));
    Ok(true)
  }

  /// Remove every item. Returns how many were removed.
  pub fn clear(&self) -> Result<usize, WatchlistError> {
    let cleared = self
      .commit(|items| {
        if items.is_empty() {
          return None;
        }
        let count = items.len();
        items.clear();
        Some(count)
      })?
      .unwrap_or(0);

    if cleared > 0 {
      self.notice(Notice::success("Watchlist cleared"));
    }
    Ok(cleared)
  }

  pub fn storage_usage(&self) -> StorageUsage {
    let items = self.lock();
    StorageUsage {
      bytes: serde_json::to_string(&*items).map(|s| s.len()).unwrap_or(0),
      items: items.len(),
    }
  }

  /// Register a callback run with the full list after every change.
  pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
  where
    F: Fn(&[WatchlistItem]) + Send + Sync + 'static,
  {
    let id = self.observers.subscribe(callback);
    debug!(observers = self.observers.len(), "watchlist observer subscribed");
    id
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.observers.unsubscribe(id)
  }

  /// User-facing messages about operation outcomes.
  pub fn notices(&self) -> broadcast::Receiver<Notice> {
    self.notices.subscribe()
  }

  /// Replace the in-memory list with what storage holds and notify
  /// observers.
  pub fn reload(&self) -> Result<(), WatchlistError> {
    let loaded = read_items(self.storage.as_ref(), &self.key)?;
    let snapshot = {
      let mut items = self.lock();
      *items = loaded;
      items.clone()
    };

    debug!(key = %self.key, count = snapshot.len(), "reloaded watchlist");
    self.observers.notify(&snapshot);
    Ok(())
  }

  /// React to a change on the bus. Returns whether the list was reloaded.
  ///
  /// Changes to other keys, and this instance's own writes, are ignored.
  pub fn handle_change(&self, change: &StorageChange) -> bool {
    if change.key != self.key || change.origin == Some(self.origin) {
      return false;
    }

    match self.reload() {
      Ok(()) => true,
      Err(e) => {
        warn!(key = %self.key, error = %e, "failed to reload watchlist after external change");
        false
      }
    }
  }
}

impl<C, S> WatchlistStore<C, S>
where
  C: CatalogLookup + 'static,
  S: KeyValueStore + 'static,
{
  /// Keep this store in step with writes made by other instances.
  ///
  /// The task holds only a weak reference and stops once the store is
  /// dropped.
  pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
    let mut rx = self.bus.subscribe();
    let store = Arc::downgrade(self);

    tokio::spawn(async move {
      loop {
        let received = rx.recv().await;
        let Some(store) = store.upgrade() else {
          break;
        };
        match received {
          Ok(change) => {
            store.handle_change(&change);
          }
          Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!(skipped, "change bus lagged, reloading");
            if let Err(e) = store.reload() {
              warn!(error = %e, "failed to reload watchlist");
            }
          }
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    })
  }
}

fn validate_rating(rating: i64) -> Result<u8, WatchlistError> {
  match u8::try_from(rating) {
    Ok(r) if RATING_RANGE.contains(&r) => Ok(r),
    _ => Err(WatchlistError::Validation(format!(
      "Rating must be between 1 and 10, got {}",
      rating
    ))),
  }
}

fn read_items<S: KeyValueStore + ?Sized>(storage: &S, key: &str) -> Result<Vec<WatchlistItem>, WatchlistError> {
  match storage.load(key)? {
    Some(raw) => serde_json::from_str(&raw)
      .map_err(|e| WatchlistError::Format(format!("stored watchlist under {}: {}", key, e))),
    None => Ok(Vec::new()),
  }
}

fn write_items<S: KeyValueStore + ?Sized>(
  storage: &S,
  key: &str,
  items: &[WatchlistItem],
) -> Result<(), StorageError> {
  let json = serde_json::to_string(items).map_err(|e| StorageError::Encode {
    key: key.to_string(),
    message: e.to_string(),
  })?;
  storage.save(key, &json)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::mock::MockTransport;
  use crate::catalog::{CatalogClient, CatalogError};
  use crate::config::CatalogConfig;
  use crate::storage::MemoryStore;
  use crate::watchlist::observers::NoticeLevel;
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use std::sync::atomic::AtomicUsize;
  use std::time::Duration;

  type Store = WatchlistStore<CatalogClient<MockTransport>, MemoryStore>;

  fn catalog() -> (MockTransport, Arc<CatalogClient<MockTransport>>) {
    let mock = MockTransport::new();
    mock.respond(
      "/movie/42",
      json!({"id": 42, "title": "Dune", "vote_average": 8.1, "genres": [{"id": 878, "name": "Sci-Fi"}]}),
    );
    mock.respond(
      "/movie/7",
      json!({"id": 7, "title": "Heat", "vote_average": 7.9, "release_date": "1995-12-15",
             "genres": [{"id": 80, "name": "Crime"}]}),
    );
    let client = CatalogClient::with_transport(mock.clone(), &CatalogConfig::default());
    (mock, Arc::new(client))
  }

  fn store_with(storage: MemoryStore) -> (MockTransport, Store) {
    let (mock, client) = catalog();
    let store = WatchlistStore::new(client, Arc::new(storage), ChangeBus::default());
    (mock, store)
  }

  fn store() -> (MockTransport, Store) {
    store_with(MemoryStore::new())
  }

  fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
  }

  #[tokio::test]
  async fn test_dune_scenario() {
    let (_, store) = store();

    assert!(store.add(42).await.unwrap());
    assert_eq!(store.len(), 1);
    let dune = store.get_item(42).unwrap();
    assert_eq!(dune.title, "Dune");
    assert!(!dune.watched);
    assert!(!dune.favorite);
    assert_eq!(dune.rating, None);

    assert_eq!(store.toggle_watched(42).unwrap(), Some(true));
    assert!(store.get_item(42).unwrap().watched_at.is_some());
    assert!(store.rate(42, 9).unwrap());
    assert_eq!(store.get_item(42).unwrap().rating, Some(9));

    let snapshot = store.export_snapshot();
    assert_eq!(snapshot.version, "1.0");
    assert_eq!(snapshot.items, vec![store.get_item(42).unwrap()]);

    let exported: serde_json::Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
    assert_eq!(exported["wishlist"][0]["id"], 42);
    assert_eq!(exported["wishlist"][0]["watched"], true);
    assert_eq!(exported["wishlist"][0]["rating"], 9);
  }

  #[tokio::test]
  async fn test_add_twice_keeps_one_entry() {
    let (mock, store) = store();
    let mut notices = store.notices();

    assert!(store.add(42).await.unwrap());
    assert!(!store.add(42).await.unwrap());

    assert_eq!(store.len(), 1);
    assert!(store.is_present(42));
    assert_eq!(mock.call_count(), 1);
    let levels: Vec<NoticeLevel> = drain(&mut notices).into_iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NoticeLevel::Success, NoticeLevel::Info]);
  }

  #[tokio::test]
  async fn test_new_items_are_prepended() {
    let (_, store) = store();
    store.add(7).await.unwrap();
    store.add(42).await.unwrap();

    let ids: Vec<i64> = store.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![42, 7]);
  }

  #[tokio::test]
  async fn test_add_fetch_failure_leaves_list_empty() {
    let (mock, store) = store();
    mock.fail("/movie/5", CatalogError::transport("connection refused"));

    let err = store.add(5).await.unwrap_err();
    assert!(matches!(err, WatchlistError::Catalog(_)));
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_add_persistence_failure_rolls_back() {
    let storage = MemoryStore::new().with_quota(10);
    let (_, store) = store_with(storage.clone());
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    store.subscribe(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut notices = store.notices();

    let err = store.add(42).await.unwrap_err();

    assert!(matches!(
      err,
      WatchlistError::Storage(StorageError::QuotaExceeded { limit: 10, .. })
    ));
    assert!(store.is_empty());
    assert!(!store.is_present(42));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert_eq!(storage.load(DEFAULT_STORAGE_KEY).unwrap(), None);
    assert_eq!(drain(&mut notices)[0].level, NoticeLevel::Error);
  }

  #[tokio::test]
  async fn test_remove() {
    let (_, store) = store();
    store.add(42).await.unwrap();

    assert!(!store.remove(99).unwrap());
    assert_eq!(store.len(), 1);

    assert!(store.remove(42).unwrap());
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_rate_validation() {
    let (_, store) = store();
    store.add(42).await.unwrap();

    for rating in [0, 11, -3] {
      assert!(matches!(store.rate(42, rating), Err(WatchlistError::Validation(_))));
    }
    assert_eq!(store.get_item(42).unwrap().rating, None);

    assert!(store.rate(42, 7).unwrap());
    let item = store.get_item(42).unwrap();
    assert_eq!(item.rating, Some(7));
    assert!(item.rated_at.is_some());

    assert!(!store.rate(99, 7).unwrap());
  }

  #[tokio::test]
  async fn test_update_toggle_and_notes() {
    let (_, store) = store();
    store.add(42).await.unwrap();

    let update = ItemUpdate {
      title: Some("Dune: Part One".to_string()),
      ..ItemUpdate::default()
    };
    assert!(store.update(42, update).unwrap());
    assert!(!store.update(99, ItemUpdate::default()).unwrap());
    assert!(store.update(42, ItemUpdate::default()).unwrap());

    let bad = ItemUpdate {
      rating: Some(Some(12)),
      ..ItemUpdate::default()
    };
    assert!(matches!(store.update(42, bad), Err(WatchlistError::Validation(_))));

    assert_eq!(store.toggle_favorite(42).unwrap(), Some(true));
    assert_eq!(store.toggle_favorite(42).unwrap(), Some(false));
    assert_eq!(store.toggle_watched(99).unwrap(), None);

    assert!(store.add_notes(42, "See it in IMAX").unwrap());

    let item = store.get_item(42).unwrap();
    assert_eq!(item.title, "Dune: Part One");
    assert_eq!(item.vote_average, 8.1);
    assert_eq!(item.notes, "See it in IMAX");
    assert!(item.notes_updated_at.is_some());
  }

  #[tokio::test]
  async fn test_toggle_watched_clears_timestamp() {
    let (_, store) = store();
    store.add(42).await.unwrap();

    store.toggle_watched(42).unwrap();
    assert_eq!(store.toggle_watched(42).unwrap(), Some(false));
    assert_eq!(store.get_item(42).unwrap().watched_at, None);
  }

  #[tokio::test]
  async fn test_queries_through_store() {
    let (_, store) = store();
    store.add(42).await.unwrap();
    store.add(7).await.unwrap();
    store.toggle_watched(7).unwrap();

    let titles = |items: Vec<WatchlistItem>| items.into_iter().map(|i| i.title).collect::<Vec<_>>();
    assert_eq!(titles(store.search("crime")), vec!["Heat"]);
    assert_eq!(
      titles(store.filter(&FilterCriteria {
        watched: Some(false),
        ..FilterCriteria::default()
      })),
      vec!["Dune"]
    );
    assert_eq!(titles(store.sort(SortKey::Rating, SortOrder::Desc)), vec!["Dune", "Heat"]);
    // Sorting does not reorder the stored list
    assert_eq!(titles(store.items()), vec!["Heat", "Dune"]);

    let stats = store.stats();
    assert_eq!((stats.total, stats.watched, stats.unwatched), (2, 1, 1));
  }

  #[tokio::test]
  async fn test_import_never_overwrites_existing() {
    let (_, store) = store();
    store.add(42).await.unwrap();
    store.rate(42, 9).unwrap();

    let payload = json!({
      "wishlist": [
        {"id": 42, "title": "Imported Dune", "rating": 2},
        {"id": 100, "title": "Arrival"},
        {"id": 100, "title": "Arrival again"}
      ]
    })
    .to_string();

    assert_eq!(store.import_snapshot(&payload).unwrap(), 1);
    let items = store.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Dune");
    assert_eq!(items[0].rating, Some(9));
    assert_eq!(items[1].title, "Arrival");

    assert_eq!(store.import_snapshot(&payload).unwrap(), 0);
  }

  #[tokio::test]
  async fn test_import_drops_out_of_range_ratings() {
    let (_, store) = store();
    let payload = json!({
      "items": [
        {"id": 1, "title": "Zero", "rating": 0},
        {"id": 2, "title": "Eleven", "rating": 11},
        {"id": 3, "title": "Huge", "rating": 300},
        {"id": 4, "title": "Fine", "rating": 6}
      ]
    })
    .to_string();

    assert_eq!(store.import_snapshot(&payload).unwrap(), 4);
    let ratings: Vec<Option<u8>> = store.items().iter().map(|i| i.rating).collect();
    assert_eq!(ratings, vec![None, None, None, Some(6)]);

    let stats = store.stats();
    assert_eq!(stats.rated, 1);
    assert_eq!(stats.average_rating, "6.0");
  }

  #[tokio::test]
  async fn test_restore_drops_out_of_range_ratings() {
    let storage = MemoryStore::new();
    storage
      .save(
        "cineverse_watchlist_backup",
        &json!({
          "timestamp": "2024-05-01T00:00:00Z",
          "version": "1.0",
          "wishlist": [{"id": 1, "title": "Zero", "rating": 0}, {"id": 2, "title": "Nine", "rating": 9}]
        })
        .to_string(),
      )
      .unwrap();
    let (_, store) = store_with(storage);

    assert!(store.restore().unwrap());
    let ratings: Vec<Option<u8>> = store.items().iter().map(|i| i.rating).collect();
    assert_eq!(ratings, vec![None, Some(9)]);
  }

  #[tokio::test]
  async fn test_import_rejects_missing_array() {
    let (_, store) = store();
    let err = store.import_snapshot(r#"{"movies": []}"#).unwrap_err();
    assert!(matches!(err, WatchlistError::Format(_)));
  }

  #[tokio::test]
  async fn test_export_then_import_into_fresh_store() {
    let (_, source) = store();
    source.add(42).await.unwrap();
    source.add(7).await.unwrap();
    let json = source.export_json().unwrap();

    let (_, target) = store();
    assert_eq!(target.import_snapshot(&json).unwrap(), 2);
    assert_eq!(target.items(), source.items());
  }

  #[tokio::test]
  async fn test_backup_and_restore() {
    let (_, store) = store();
    assert!(!store.restore().unwrap());

    store.add(42).await.unwrap();
    store.backup().unwrap();
    store.add(7).await.unwrap();
    store.remove(42).unwrap();

    assert!(store.restore().unwrap());
    let ids: Vec<i64> = store.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![42]);
  }

  #[tokio::test]
  async fn test_clear_and_usage() {
    let (_, store) = store();
    assert_eq!(store.clear().unwrap(), 0);

    store.add(42).await.unwrap();
    let usage = store.storage_usage();
    assert_eq!(usage.items, 1);
    assert!(usage.bytes > 0);

    assert_eq!(store.clear().unwrap(), 1);
    assert!(store.is_empty());
    assert_eq!(store.storage_usage(), StorageUsage { bytes: 2, items: 0 });
  }

  #[tokio::test]
  async fn test_list_survives_new_instance() {
    let storage = MemoryStore::new();
    let (_, first) = store_with(storage.clone());
    first.add(42).await.unwrap();
    first.toggle_favorite(42).unwrap();

    let (_, second) = store_with(storage);
    assert_eq!(second.items(), first.items());
  }

  #[tokio::test]
  async fn test_refresh_all_is_best_effort() {
    let (mock, client) = catalog();
    let store = WatchlistStore::new(client.clone(), Arc::new(MemoryStore::new()), ChangeBus::default());
    store.add(42).await.unwrap();
    store.add(7).await.unwrap();
    store.add_notes(42, "keep me").unwrap();

    mock.respond(
      "/movie/42",
      json!({"id": 42, "title": "Dune (Remastered)", "vote_average": 8.3, "genres": []}),
    );
    mock.fail(
      "/movie/7",
      CatalogError::Fetch {
        status: Some(500),
        message: "boom".to_string(),
      },
    );
    client.clear_cache();

    let summary = store.refresh_all().await.unwrap();
    assert_eq!(summary, RefreshSummary { refreshed: 1, failed: 1 });

    let dune = store.get_item(42).unwrap();
    assert_eq!(dune.title, "Dune (Remastered)");
    assert_eq!(dune.vote_average, 8.3);
    assert_eq!(dune.notes, "keep me");
    assert!(dune.last_updated.is_some());

    let heat = store.get_item(7).unwrap();
    assert_eq!(heat.title, "Heat");
    assert!(heat.last_updated.is_none());
  }

  #[tokio::test]
  async fn test_refresh_single_item() {
    let (mock, client) = catalog();
    let store = WatchlistStore::new(client.clone(), Arc::new(MemoryStore::new()), ChangeBus::default());
    assert!(!store.refresh(42).await.unwrap());

    store.add(42).await.unwrap();
    mock.respond("/movie/42", json!({"id": 42, "title": "Dune", "runtime": 155}));
    client.clear_cache();

    assert!(store.refresh(42).await.unwrap());
    assert_eq!(store.get_item(42).unwrap().runtime, Some(155));
  }

  #[tokio::test]
  async fn test_panicking_observer_does_not_block_others() {
    let (_, store) = store();
    let calls = Arc::new(AtomicUsize::new(0));

    store.subscribe(|_| panic!("broken view"));
    let counter = calls.clone();
    let id = store.subscribe(move |items| {
      counter.fetch_add(items.len(), Ordering::SeqCst);
    });

    assert!(store.add(42).await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(store.unsubscribe(id));
    store.toggle_watched(42).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_handle_change_ignores_own_writes_and_other_keys() {
    let storage = MemoryStore::new();
    let (_, store) = store_with(storage.clone());
    store.add(42).await.unwrap();

    let own = StorageChange {
      key: DEFAULT_STORAGE_KEY.to_string(),
      origin: Some(store.origin),
    };
    assert!(!store.handle_change(&own));

    let other_key = StorageChange {
      key: "user_session".to_string(),
      origin: None,
    };
    assert!(!store.handle_change(&other_key));

    storage.save(DEFAULT_STORAGE_KEY, "[]").unwrap();
    let external = StorageChange {
      key: DEFAULT_STORAGE_KEY.to_string(),
      origin: None,
    };
    assert!(store.handle_change(&external));
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_two_stores_stay_in_sync() {
    let (_, client) = catalog();
    let storage = Arc::new(MemoryStore::new());
    let bus = ChangeBus::default();

    let writer = WatchlistStore::new(client.clone(), storage.clone(), bus.clone());
    let reader = Arc::new(WatchlistStore::new(client, storage, bus));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    reader.subscribe(move |items| {
      let _ = tx.send(items.iter().map(|i| i.id).collect::<Vec<_>>());
    });
    let sync = reader.spawn_sync();

    writer.add(42).await.unwrap();
    let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .unwrap()
      .unwrap();
    sync.abort();

    assert_eq!(seen, vec![42]);
    assert!(reader.is_present(42));
  }
}
