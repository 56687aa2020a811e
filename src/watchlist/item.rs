use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;
use tracing::warn;

use crate::catalog::{Genre, MovieDetails};

/// Valid user ratings.
pub const RATING_RANGE: RangeInclusive<u8> = 1..=10;

/// A saved movie.
///
/// Field names match the exported document layout, so files written by
/// other versions of the app import cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
  pub id: i64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub poster_path: Option<String>,
  #[serde(default)]
  pub backdrop_path: Option<String>,
  #[serde(default)]
  pub overview: String,
  #[serde(default)]
  pub release_date: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub genres: Vec<Genre>,
  /// Genre ids as listed in catalog search results; kept in step with `genres`
  #[serde(default)]
  pub genre_ids: Vec<i64>,
  #[serde(default)]
  pub runtime: Option<u32>,
  #[serde(rename = "addedAt", default = "Utc::now")]
  pub added_at: DateTime<Utc>,
  #[serde(default)]
  pub watched: bool,
  #[serde(rename = "watchedAt", default)]
  pub watched_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "rating_in_range")]
  pub rating: Option<u8>,
  #[serde(rename = "ratedAt", default)]
  pub rated_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes: String,
  #[serde(rename = "notesUpdatedAt", default)]
  pub notes_updated_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub favorite: bool,
  #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
  pub last_updated: Option<DateTime<Utc>>,
}

impl WatchlistItem {
  /// New, unwatched, unrated entry built from a catalog record.
  pub fn from_details(details: &MovieDetails, now: DateTime<Utc>) -> Self {
    Self {
      id: details.id,
      title: details.title.clone(),
      poster_path: details.poster_path.clone(),
      backdrop_path: details.backdrop_path.clone(),
      overview: details.overview.clone(),
      release_date: details.release_date.clone(),
      vote_average: details.vote_average,
      genres: details.genres.clone(),
      genre_ids: details.genres.iter().map(|g| g.id).collect(),
      runtime: details.runtime,
      added_at: now,
      watched: false,
      watched_at: None,
      rating: None,
      rated_at: None,
      notes: String::new(),
      notes_updated_at: None,
      favorite: false,
      last_updated: None,
    }
  }

  /// Overwrite the catalog-sourced fields, keeping the user's own data.
  pub fn apply_details(&mut self, details: &MovieDetails, now: DateTime<Utc>) {
    self.title = details.title.clone();
    self.poster_path = details.poster_path.clone();
    self.backdrop_path = details.backdrop_path.clone();
    self.overview = details.overview.clone();
    self.release_date = details.release_date.clone();
    self.vote_average = details.vote_average;
    self.genres = details.genres.clone();
    self.genre_ids = details.genres.iter().map(|g| g.id).collect();
    self.runtime = details.runtime;
    self.last_updated = Some(now);
  }

  pub fn release(&self) -> Option<NaiveDate> {
    self
      .release_date
      .as_deref()
      .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
  }

  pub fn release_year(&self) -> Option<i32> {
    self.release().map(|d| d.year())
  }

  /// Whether the item is tagged with `genre_id`, by name list or id list.
  pub fn has_genre(&self, genre_id: i64) -> bool {
    self.genres.iter().any(|g| g.id == genre_id) || self.genre_ids.contains(&genre_id)
  }
}

/// Accept any integer rating, dropping values outside [`RATING_RANGE`]
/// so a bad entry in a stored or imported list does not reject the rest.
fn rating_in_range<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(raw) = Option::<i64>::deserialize(deserializer)? else {
    return Ok(None);
  };
  match u8::try_from(raw) {
    Ok(rating) if RATING_RANGE.contains(&rating) => Ok(Some(rating)),
    _ => {
      warn!(rating = raw, "ignoring out of range rating");
      Ok(None)
    }
  }
}

/// Partial update; only fields that are `Some` are applied.
///
/// Nullable fields take `Some(None)` to clear them.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
  pub title: Option<String>,
  pub overview: Option<String>,
  pub poster_path: Option<Option<String>>,
  pub backdrop_path: Option<Option<String>>,
  pub release_date: Option<Option<String>>,
  pub vote_average: Option<f64>,
  pub genres: Option<Vec<Genre>>,
  pub runtime: Option<Option<u32>>,
  pub watched: Option<bool>,
  pub favorite: Option<bool>,
  pub rating: Option<Option<u8>>,
  pub notes: Option<String>,
}

impl ItemUpdate {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.overview.is_none()
      && self.poster_path.is_none()
      && self.backdrop_path.is_none()
      && self.release_date.is_none()
      && self.vote_average.is_none()
      && self.genres.is_none()
      && self.runtime.is_none()
      && self.watched.is_none()
      && self.favorite.is_none()
      && self.rating.is_none()
      && self.notes.is_none()
  }

  pub fn apply(self, item: &mut WatchlistItem, now: DateTime<Utc>) {
    if let Some(title) = self.title {
      item.title = title;
    }
    if let Some(overview) = self.overview {
      item.overview = overview;
    }
    if let Some(path) = self.poster_path {
      item.poster_path = path;
    }
    if let Some(path) = self.backdrop_path {
      item.backdrop_path = path;
    }
    if let Some(date) = self.release_date {
      item.release_date = date;
    }
    if let Some(vote) = self.vote_average {
      item.vote_average = vote;
    }
    if let Some(genres) = self.genres {
      item.genre_ids = genres.iter().map(|g| g.id).collect();
      item.genres = genres;
    }
    if let Some(runtime) = self.runtime {
      item.runtime = runtime;
    }
    if let Some(watched) = self.watched {
      if watched != item.watched {
        item.watched_at = watched.then_some(now);
      }
      item.watched = watched;
    }
    if let Some(favorite) = self.favorite {
      item.favorite = favorite;
    }
    if let Some(rating) = self.rating {
      item.rated_at = rating.map(|_| now);
      item.rating = rating;
    }
    if let Some(notes) = self.notes {
      item.notes = notes;
      item.notes_updated_at = Some(now);
    }
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;
  use chrono::TimeZone;

  pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  pub fn item(id: i64, title: &str) -> WatchlistItem {
    WatchlistItem {
      id,
      title: title.to_string(),
      poster_path: None,
      backdrop_path: None,
      overview: String::new(),
      release_date: None,
      vote_average: 0.0,
      genres: Vec::new(),
      genre_ids: Vec::new(),
      runtime: None,
      added_at: at(id),
      watched: false,
      watched_at: None,
      rating: None,
      rated_at: None,
      notes: String::new(),
      notes_updated_at: None,
      favorite: false,
      last_updated: None,
    }
  }

  pub fn genre(id: i64, name: &str) -> Genre {
    Genre {
      id,
      name: name.to_string(),
    }
  }
}
