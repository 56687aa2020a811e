//! Serde types for the catalog responses the app reads field by field.
//!
//! Endpoints whose payload is only passed through (trending mixes,
//! person pages, reviews, videos) stay as `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreList {
  #[serde(default)]
  pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
  #[serde(default)]
  pub page: u32,
  #[serde(default = "Vec::new")]
  pub results: Vec<T>,
  #[serde(default)]
  pub total_pages: u32,
  #[serde(default)]
  pub total_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
  pub id: i64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub overview: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub release_date: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub genre_ids: Vec<i64>,
  #[serde(default)]
  pub original_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvSummary {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub overview: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub first_air_date: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub genre_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonSummary {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  pub profile_path: Option<String>,
  pub known_for_department: Option<String>,
}

/// Full movie record, optionally with appended sub-resources
/// (videos, credits, similar, reviews) kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
  pub id: i64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub overview: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub release_date: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub genres: Vec<Genre>,
  pub runtime: Option<u32>,
  pub tagline: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  pub character: Option<String>,
  pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  pub job: Option<String>,
  pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credits {
  #[serde(default)]
  pub cast: Vec<CastMember>,
  #[serde(default)]
  pub crew: Vec<CrewMember>,
}
