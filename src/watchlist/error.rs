use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum WatchlistError {
  #[error("{0}")]
  Validation(String),

  #[error("invalid watchlist file: {0}")]
  Format(String),

  #[error(transparent)]
  Storage(#[from] StorageError),

  #[error(transparent)]
  Catalog(#[from] CatalogError),
}
