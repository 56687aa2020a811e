//! SQLite-backed key/value storage.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{check_quota, KeyValueStore, StorageError};

/// Schema for the key/value table.
///
/// `revision` is bumped on every write so that other connections to the
/// same file can tell which keys changed.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    revision INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite storage implementation.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  quota: Option<usize>,
  /// Last revision this handle knows about, per key
  seen: Mutex<HashMap<String, i64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn backend(context: &str) -> impl Fn(rusqlite::Error) -> StorageError + '_ {
  move |e| StorageError::Backend(format!("{}: {}", context, e))
}

impl SqliteStore {
  /// Open or create the database at `path`.
  pub fn open(path: &Path) -> Result<Self, StorageError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StorageError::Backend(format!("Failed to create storage directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StorageError::Backend(format!("Failed to open database at {}: {}", path.display(), e))
    })?;
    conn
      .busy_timeout(std::time::Duration::from_secs(5))
      .map_err(backend("Failed to set busy timeout"))?;

    let store = Self {
      conn: Mutex::new(conn),
      quota: None,
      seen: Mutex::new(HashMap::new()),
    };
    store.run_migrations()?;

    // Start from the current state so the first poll reports only new writes
    let current = store.revisions()?;
    *lock(&store.seen) = current;

    debug!(path = %path.display(), "opened storage");
    Ok(store)
  }

  /// Reject writes that would push the total stored bytes past `bytes`.
  pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
    self.quota = bytes;
    self
  }

  fn run_migrations(&self) -> Result<(), StorageError> {
    lock(&self.conn)
      .execute_batch(SCHEMA)
      .map_err(backend("Failed to run storage migrations"))
  }

  fn revisions(&self) -> Result<HashMap<String, i64>, StorageError> {
    let conn = lock(&self.conn);
    let mut stmt = conn
      .prepare("SELECT key, revision FROM kv_store")
      .map_err(backend("Failed to prepare query"))?;

    let rows = stmt
      .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
      .map_err(backend("Failed to query revisions"))?;

    rows
      .collect::<Result<HashMap<_, _>, _>>()
      .map_err(backend("Failed to read revisions"))
  }
}

impl KeyValueStore for SqliteStore {
  fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
    lock(&self.conn)
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(backend("Failed to load value"))
  }

  fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
    // Lock order everywhere: seen, then conn
    let mut seen = lock(&self.seen);
    let conn = lock(&self.conn);

    if self.quota.is_some() {
      let others: i64 = conn
        .query_row(
          "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv_store WHERE key != ?",
          params![key],
          |row| row.get(0),
        )
        .map_err(backend("Failed to measure storage"))?;
      check_quota(self.quota, others.max(0) as usize, value.len())?;
    }

    let revision: i64 = conn
      .query_row(
        "INSERT INTO kv_store (key, value, revision, updated_at)
         VALUES (?1, ?2, (SELECT COALESCE(MAX(revision), 0) + 1 FROM kv_store), datetime('now'))
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           revision = excluded.revision,
           updated_at = excluded.updated_at
         RETURNING revision",
        params![key, value],
        |row| row.get(0),
      )
      .map_err(backend("Failed to store value"))?;

    seen.insert(key.to_string(), revision);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut seen = lock(&self.seen);
    lock(&self.conn)
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(backend("Failed to delete value"))?;

    seen.remove(key);
    Ok(())
  }

  fn poll_changes(&self) -> Result<Vec<String>, StorageError> {
    // Held across the read so a local save cannot land in between
    let mut seen = lock(&self.seen);
    let current = self.revisions()?;

    let mut changed: Vec<String> = current
      .iter()
      .filter(|(key, revision)| seen.get(*key) != Some(*revision))
      .map(|(key, _)| key.clone())
      .collect();

    // Keys deleted elsewhere
    changed.extend(seen.keys().filter(|key| !current.contains_key(*key)).cloned());
    changed.sort();

    *seen = current;
    Ok(changed)
  }
}
