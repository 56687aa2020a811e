//! Export documents, import parsing and the backup slot layout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WatchlistError;
use super::item::WatchlistItem;

pub const FORMAT_VERSION: &str = "1.0";

/// Exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  #[serde(rename = "exportDate", alias = "exportedAt")]
  pub export_date: DateTime<Utc>,
  pub version: String,
  #[serde(rename = "wishlist", alias = "items")]
  pub items: Vec<WatchlistItem>,
}

impl Snapshot {
  pub fn new(items: Vec<WatchlistItem>, now: DateTime<Utc>) -> Self {
    Self {
      export_date: now,
      version: FORMAT_VERSION.to_string(),
      items,
    }
  }
}

/// Contents of the backup slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
  pub timestamp: DateTime<Utc>,
  #[serde(default = "default_version")]
  pub version: String,
  pub wishlist: Vec<WatchlistItem>,
}

fn default_version() -> String {
  FORMAT_VERSION.to_string()
}

/// Items from an import document.
///
/// Any JSON object with an array under `wishlist` (preferred) or `items`
/// is accepted; other fields are ignored.
pub fn parse_import(payload: &str) -> Result<Vec<WatchlistItem>, WatchlistError> {
  let document: Value =
    serde_json::from_str(payload).map_err(|e| WatchlistError::Format(format!("not JSON: {}", e)))?;

  let list = ["wishlist", "items"]
    .iter()
    .find_map(|field| document.get(field).filter(|v| v.is_array()))
    .ok_or_else(|| {
      WatchlistError::Format("expected a `wishlist` or `items` array".to_string())
    })?;

  serde_json::from_value(list.clone())
    .map_err(|e| WatchlistError::Format(format!("bad watchlist entry: {}", e)))
}

/// Suggested file name for an export made on `date`.
pub fn file_name(date: NaiveDate) -> String {
  format!("cineverse-watchlist-{}.json", date.format("%Y-%m-%d"))
}
