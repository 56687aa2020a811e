//! Parameter builders for the `/discover` endpoints.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::models::{MovieSummary, PaginatedResponse, TvSummary};
use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

const POPULARITY_DESC: &str = "popularity.desc";

/// Optional constraints for movie discovery. Absent fields add nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFilters {
  pub genre: Option<i64>,
  pub year: Option<i32>,
  /// Minimum catalog vote average
  pub rating: Option<f64>,
  /// ISO 639-1 original language (e.g., "en")
  pub language: Option<String>,
  /// ISO 3166-1 region (e.g., "US")
  pub region: Option<String>,
  /// Person id that must appear in the cast
  pub actor: Option<i64>,
  /// Person id that must appear in the crew
  pub director: Option<i64>,
}

impl MovieFilters {
  pub fn to_params(&self, page: u32) -> QueryParams {
    QueryParams::page(page)
      .with("sort_by", POPULARITY_DESC)
      .with_opt("with_genres", self.genre)
      .with_opt("primary_release_year", self.year)
      .with_opt("vote_average.gte", self.rating)
      .with_opt("with_original_language", non_blank(&self.language))
      .with_opt("region", non_blank(&self.region))
      .with_opt("with_cast", self.actor)
      .with_opt("with_crew", self.director)
  }
}

/// Optional constraints for TV discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TvFilters {
  pub genre: Option<i64>,
  /// First air date year
  pub year: Option<i32>,
  pub rating: Option<f64>,
  pub language: Option<String>,
}

impl TvFilters {
  pub fn to_params(&self, page: u32) -> QueryParams {
    QueryParams::page(page)
      .with("sort_by", POPULARITY_DESC)
      .with_opt("with_genres", self.genre)
      .with_opt("first_air_date_year", self.year)
      .with_opt("vote_average.gte", self.rating)
      .with_opt("with_original_language", non_blank(&self.language))
  }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Film industries reachable through a language + region pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Industry {
  Bollywood,
  Tollywood,
  Hollywood,
}

impl Industry {
  /// (original language, region)
  pub fn locale(self) -> (&'static str, &'static str) {
    match self {
      Self::Bollywood => ("hi", "IN"),
      Self::Tollywood => ("te", "IN"),
      Self::Hollywood => ("en", "US"),
    }
  }
}

impl<T: Transport> CatalogClient<T> {
  async fn discover_movies(&self, params: QueryParams) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.request_as("/discover/movie", params).await
  }

  /// GET /discover/movie with every present filter applied
  pub async fn filtered_movies(
    &self,
    filters: &MovieFilters,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.discover_movies(filters.to_params(page)).await
  }

  /// GET /discover/tv with every present filter applied
  pub async fn filtered_tv(
    &self,
    filters: &TvFilters,
    page: u32,
  ) -> Result<PaginatedResponse<TvSummary>, CatalogError> {
    self.request_as("/discover/tv", filters.to_params(page)).await
  }

  pub async fn movies_by_genre(
    &self,
    genre_id: i64,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    let filters = MovieFilters {
      genre: Some(genre_id),
      ..MovieFilters::default()
    };
    self.filtered_movies(&filters, page).await
  }

  pub async fn movies_by_actor(
    &self,
    actor_id: i64,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    let filters = MovieFilters {
      actor: Some(actor_id),
      ..MovieFilters::default()
    };
    self.filtered_movies(&filters, page).await
  }

  pub async fn movies_by_language(
    &self,
    language: &str,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    let filters = MovieFilters {
      language: Some(language.to_string()),
      ..MovieFilters::default()
    };
    self.filtered_movies(&filters, page).await
  }

  pub async fn industry_movies(
    &self,
    industry: Industry,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    let (language, region) = industry.locale();
    let filters = MovieFilters {
      language: Some(language.to_string()),
      region: Some(region.to_string()),
      ..MovieFilters::default()
    };
    self.filtered_movies(&filters, page).await
  }

  /// Movies first released between two `YYYY-MM-DD` dates, inclusive
  pub async fn movies_by_date_range(
    &self,
    start: &str,
    end: &str,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self
      .discover_movies(
        QueryParams::page(page)
          .with("sort_by", POPULARITY_DESC)
          .with("primary_release_date.gte", start)
          .with("primary_release_date.lte", end),
      )
      .await
  }

  /// Best rated movies with enough votes to be meaningful
  pub async fn high_rated_movies(
    &self,
    min_rating: f64,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self
      .discover_movies(
        QueryParams::page(page)
          .with("sort_by", "vote_average.desc")
          .with("vote_average.gte", min_rating)
          .with("vote_count.gte", 1000),
      )
      .await
  }
}
