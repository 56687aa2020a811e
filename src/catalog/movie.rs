use serde_json::Value;

use super::models::{Credits, Genre, GenreList, MovieDetails, MovieSummary, PaginatedResponse};
use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

/// Sub-resources fetched together with a detail record
pub const DETAIL_APPEND: &str = "videos,credits,similar,reviews";

impl<T: Transport> CatalogClient<T> {
  /// GET /movie/popular
  pub async fn popular(&self, page: u32) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.request_as("/movie/popular", QueryParams::page(page)).await
  }

  /// GET /movie/top_rated
  pub async fn top_rated(&self, page: u32) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.request_as("/movie/top_rated", QueryParams::page(page)).await
  }

  /// GET /movie/upcoming
  pub async fn upcoming(&self, page: u32) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.request_as("/movie/upcoming", QueryParams::page(page)).await
  }

  /// GET /movie/now_playing
  pub async fn now_playing(&self, page: u32) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self.request_as("/movie/now_playing", QueryParams::page(page)).await
  }

  /// GET /movie/{id} with videos, credits, similar titles and reviews appended
  pub async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, CatalogError> {
    self
      .request_as(
        &format!("/movie/{}", movie_id),
        QueryParams::new().with("append_to_response", DETAIL_APPEND),
      )
      .await
  }

  /// GET /movie/{id}/credits
  pub async fn movie_credits(&self, movie_id: i64) -> Result<Credits, CatalogError> {
    self
      .request_as(&format!("/movie/{}/credits", movie_id), QueryParams::new())
      .await
  }

  /// GET /movie/{id}/similar
  pub async fn similar_movies(
    &self,
    movie_id: i64,
    page: u32,
  ) -> Result<PaginatedResponse<MovieSummary>, CatalogError> {
    self
      .request_as(&format!("/movie/{}/similar", movie_id), QueryParams::page(page))
      .await
  }

  /// GET /movie/{id}/reviews
  pub async fn movie_reviews(&self, movie_id: i64, page: u32) -> Result<Value, CatalogError> {
    self
      .request(&format!("/movie/{}/reviews", movie_id), QueryParams::page(page))
      .await
  }

  /// GET /movie/{id}/videos (trailers, teasers, ...)
  pub async fn movie_videos(&self, movie_id: i64) -> Result<Value, CatalogError> {
    self
      .request(&format!("/movie/{}/videos", movie_id), QueryParams::new())
      .await
  }

  /// GET /genre/movie/list
  pub async fn movie_genres(&self) -> Result<Vec<Genre>, CatalogError> {
    let list: GenreList = self.request_as("/genre/movie/list", QueryParams::new()).await?;
    Ok(list.genres)
  }
}
