use clap::ValueEnum;
use serde_json::Value;

use super::client::require_query;
use super::models::{MovieSummary, PaginatedResponse, PersonSummary, TvSummary};
use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

/// Which `/search/{kind}` endpoint to hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SearchKind {
  #[default]
  Movie,
  Tv,
  Person,
  Multi,
}

impl SearchKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Movie => "movie",
      Self::Tv => "tv",
      Self::Person => "person",
      Self::Multi => "multi",
    }
  }
}

/// Search with the optional extras the catalog accepts.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
  pub query: String,
  pub kind: SearchKind,
  pub page: u32,
  pub include_adult: bool,
  pub year: Option<i32>,
  pub region: Option<String>,
}

impl SearchOptions {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      page: 1,
      ..Self::default()
    }
  }

  pub fn to_params(&self) -> QueryParams {
    QueryParams::page(self.page.max(1))
      .with("query", self.query.trim())
      .with("include_adult", self.include_adult)
      .with_opt("year", self.year)
      .with_opt("region", self.region.as_deref())
  }
}

impl<T: Transport> CatalogClient<T> {
  async fn search<D: serde::de::DeserializeOwned>(
    &self,
    kind: SearchKind,
    query: &str,
    page: u32,
  ) -> Result<D, CatalogError> {
    require_query(query)?;
    self
      .request_as(
        &format!("/search/{}", kind.as_str()),
        QueryParams::page(page).with("query", query),
      )
      .await
  }

  /// GET /search/movie
  pub async fn search_movies(
    &self,
    query: &str,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.search(SearchKind::Movie, query, page).await
  }

  /// GET /search/tv
  pub async fn search_tv(&self, query: &str, page: u32) -> Result<PaginatedResponse<TvSummary>, CatalogError> {
    self.search(SearchKind::Tv, query, page).await
  }

  /// GET /search/person
  pub async fn search_people(
    &self,
    query: &str,
    page: u32,
  ) -> Result<PaginatedResponse<PersonSummary>, CatalogError> {
    self.search(SearchKind::Person, query, page).await
  }

  /// GET /search/multi (movies, shows and people mixed)
  pub async fn search_multi(&self, query: &str, page: u32) -> Result<Value, CatalogError> {
    self.search(SearchKind::Multi, query, page).await
  }

  /// GET /search/{kind} with adult/year/region options
  pub async fn advanced_search(&self, options: &SearchOptions) -> Result<Value, CatalogError> {
    require_query(&options.query)?;
    self
      .request(
        &format!("/search/{}", options.kind.as_str()),
        options.to_params(),
      )
      .await
  }
}
