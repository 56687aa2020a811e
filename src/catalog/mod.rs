//! Client for the remote movie catalog (TMDB v3 API shape).

mod client;
mod discover;
mod error;
mod images;
pub mod models;
mod movie;
mod params;
mod person;
mod search;
mod transport;
mod trending;
mod tv;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{BatchRequest, CatalogClient, CatalogLookup};
pub use discover::{Industry, MovieFilters, TvFilters};
pub use error::CatalogError;
pub use models::{Genre, MovieDetails};
pub use search::{SearchKind, SearchOptions};
pub use trending::{MediaType, TimeWindow};
