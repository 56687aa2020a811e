//! The user's saved movies.

mod error;
mod item;
mod observers;
mod query;
mod snapshot;
mod stats;
mod store;

pub use item::{ItemUpdate, WatchlistItem};
pub use observers::{Notice, NoticeLevel};
pub use query::{FilterCriteria, SortKey, SortOrder};
pub use snapshot::file_name as export_file_name;
pub use store::WatchlistStore;
