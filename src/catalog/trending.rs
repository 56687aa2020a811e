use clap::ValueEnum;
use serde_json::Value;

use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MediaType {
  #[default]
  Movie,
  Tv,
  Person,
  All,
}

impl MediaType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Movie => "movie",
      Self::Tv => "tv",
      Self::Person => "person",
      Self::All => "all",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TimeWindow {
  #[default]
  Day,
  Week,
}

impl TimeWindow {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Day => "day",
      Self::Week => "week",
    }
  }
}

impl<T: Transport> CatalogClient<T> {
  /// GET /trending/{media}/{window}
  ///
  /// Results mix media types when `media` is `All`, so they are returned as raw JSON.
  pub async fn trending(&self, media: MediaType, window: TimeWindow, page: u32) -> Result<Value, CatalogError> {
    self
      .request(
        &format!("/trending/{}/{}", media.as_str(), window.as_str()),
        QueryParams::page(page),
      )
      .await
  }

  /// GET /configuration (image sizes, base URLs)
  pub async fn configuration(&self) -> Result<Value, CatalogError> {
    self.request("/configuration", QueryParams::new()).await
  }
}
