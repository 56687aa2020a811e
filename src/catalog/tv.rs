use serde_json::Value;

use super::models::{Credits, Genre, GenreList, PaginatedResponse, TvSummary};
use super::movie::DETAIL_APPEND;
use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

impl<T: Transport> CatalogClient<T> {
  /// GET /tv/{id} with videos, credits, similar shows and reviews appended
  pub async fn tv_details(&self, tv_id: i64) -> Result<Value, CatalogError> {
    self
      .request(
        &format!("/tv/{}", tv_id),
        QueryParams::new().with("append_to_response", DETAIL_APPEND),
      )
      .await
  }

  /// GET /tv/{id}/credits
  pub async fn tv_credits(&self, tv_id: i64) -> Result<Credits, CatalogError> {
    self
      .request_as(&format!("/tv/{}/credits", tv_id), QueryParams::new())
      .await
  }

  /// GET /genre/tv/list
  pub async fn tv_genres(&self) -> Result<Vec<Genre>, CatalogError> {
    let list: GenreList = self.request_as("/genre/tv/list", QueryParams::new()).await?;
    Ok(list.genres)
  }

  /// GET /discover/tv filtered to one genre, most popular first
  pub async fn tv_by_genre(
    &self,
    genre_id: i64,
    page: u32,
  ) -> Result<PaginatedResponse<TvSummary>, CatalogError> {
    self
      .request_as(
        "/discover/tv",
        QueryParams::page(page)
          .with("with_genres", genre_id)
          .with("sort_by", "popularity.desc"),
      )
      .await
  }
}
