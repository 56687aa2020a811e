//! In-memory request cache with time-based expiry.
//!
//! This module provides a transport-agnostic memoization layer that:
//! - Stores values under a hashed query key with the time they were stored
//! - Treats entries older than the TTL as absent and evicts them on lookup
//! - Shares one pending fetch between concurrent callers asking for the same key

mod layer;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheStats, QueryKey};
