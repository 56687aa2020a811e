//! Read-only views over the saved list: text search, filtering and sorting.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::item::WatchlistItem;

/// Conjunctive filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
  pub watched: Option<bool>,
  pub favorite: Option<bool>,
  /// Genre id the item must carry
  pub genre: Option<i64>,
  /// Minimum catalog vote average
  pub min_rating: Option<f64>,
  /// Exact release year
  pub year: Option<i32>,
}

impl FilterCriteria {
  pub fn matches(&self, item: &WatchlistItem) -> bool {
    self.watched.map_or(true, |w| item.watched == w)
      && self.favorite.map_or(true, |f| item.favorite == f)
      && self.genre.map_or(true, |id| item.has_genre(id))
      && self.min_rating.map_or(true, |min| item.vote_average >= min)
      && self.year.map_or(true, |year| item.release_year() == Some(year))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
  Title,
  ReleaseDate,
  /// Catalog vote average
  Rating,
  #[default]
  AddedAt,
  UserRating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Case-insensitive substring match on title, overview and genre names.
/// A blank query matches everything.
pub fn search<'a>(items: &'a [WatchlistItem], query: &str) -> Vec<&'a WatchlistItem> {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return items.iter().collect();
  }

  items
    .iter()
    .filter(|item| {
      item.title.to_lowercase().contains(&needle)
        || item.overview.to_lowercase().contains(&needle)
        || item
          .genres
          .iter()
          .any(|g| g.name.to_lowercase().contains(&needle))
    })
    .collect()
}

pub fn filter<'a>(items: &'a [WatchlistItem], criteria: &FilterCriteria) -> Vec<&'a WatchlistItem> {
  items.iter().filter(|item| criteria.matches(item)).collect()
}

/// Stable sort; items missing the sort value compare as zero.
pub fn sort(items: &mut [WatchlistItem], key: SortKey, order: SortOrder) {
  items.sort_by(|a, b| {
    let ordering = compare(a, b, key);
    match order {
      SortOrder::Asc => ordering,
      SortOrder::Desc => ordering.reverse(),
    }
  });
}

fn compare(a: &WatchlistItem, b: &WatchlistItem, key: SortKey) -> Ordering {
  match key {
    SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    SortKey::ReleaseDate => a.release().cmp(&b.release()),
    SortKey::Rating => a.vote_average.total_cmp(&b.vote_average),
    SortKey::AddedAt => a.added_at.cmp(&b.added_at),
    SortKey::UserRating => a.rating.unwrap_or(0).cmp(&b.rating.unwrap_or(0)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::watchlist::item::fixtures::{genre, item};
  use pretty_assertions::assert_eq;

  fn titles<'a>(items: impl IntoIterator<Item = &'a WatchlistItem>) -> Vec<&'a str> {
    items.into_iter().map(|i| i.title.as_str()).collect()
  }

  fn flags_fixture() -> Vec<WatchlistItem> {
    let mut both = item(1, "Both");
    both.watched = true;
    both.favorite = true;
    let mut watched = item(2, "Watched");
    watched.watched = true;
    let mut favorite = item(3, "Favorite");
    favorite.favorite = true;
    vec![both, watched, favorite, item(4, "Neither")]
  }

  #[test]
  fn test_filter_is_conjunctive() {
    let items = flags_fixture();
    let criteria = FilterCriteria {
      watched: Some(true),
      favorite: Some(true),
      ..FilterCriteria::default()
    };
    assert_eq!(titles(filter(&items, &criteria)), vec!["Both"]);

    let unwatched = FilterCriteria {
      watched: Some(false),
      ..FilterCriteria::default()
    };
    assert_eq!(titles(filter(&items, &unwatched)), vec!["Favorite", "Neither"]);
    assert_eq!(filter(&items, &FilterCriteria::default()).len(), 4);
  }

  #[test]
  fn test_filter_genre_rating_year() {
    let mut dune = item(1, "Dune");
    dune.genres = vec![genre(878, "Sci-Fi")];
    dune.vote_average = 8.1;
    dune.release_date = Some("2021-10-22".to_string());
    let mut heat = item(2, "Heat");
    heat.genres = vec![genre(80, "Crime")];
    heat.vote_average = 7.9;
    heat.release_date = Some("1995-12-15".to_string());
    let items = vec![dune, heat, item(3, "Undated")];

    let by_genre = FilterCriteria {
      genre: Some(80),
      ..FilterCriteria::default()
    };
    assert_eq!(titles(filter(&items, &by_genre)), vec!["Heat"]);

    let by_rating = FilterCriteria {
      min_rating: Some(8.0),
      ..FilterCriteria::default()
    };
    assert_eq!(titles(filter(&items, &by_rating)), vec!["Dune"]);

    let by_year = FilterCriteria {
      year: Some(1995),
      min_rating: Some(7.0),
      ..FilterCriteria::default()
    };
    assert_eq!(titles(filter(&items, &by_year)), vec!["Heat"]);
  }

  #[test]
  fn test_search_fields_and_blank_query() {
    let mut dune = item(1, "Dune");
    dune.genres = vec![genre(878, "Science Fiction")];
    let mut heat = item(2, "Heat");
    heat.overview = "A group of professional bank robbers".to_string();
    let items = vec![dune, heat];

    assert_eq!(titles(search(&items, "SCIENCE")), vec!["Dune"]);
    assert_eq!(titles(search(&items, "robbers")), vec!["Heat"]);
    assert_eq!(titles(search(&items, "hea")), vec!["Heat"]);
    assert_eq!(search(&items, "   ").len(), 2);
    assert!(search(&items, "zzz").is_empty());
  }

  #[test]
  fn test_sort_title_case_insensitive() {
    let mut items = vec![item(1, "Zeta"), item(2, "alpha"), item(3, "Mid")];
    sort(&mut items, SortKey::Title, SortOrder::Asc);
    assert_eq!(titles(&items), vec!["alpha", "Mid", "Zeta"]);

    sort(&mut items, SortKey::Title, SortOrder::Desc);
    assert_eq!(titles(&items), vec!["Zeta", "Mid", "alpha"]);
  }

  #[test]
  fn test_sort_missing_values_as_zero() {
    let mut rated = item(1, "Rated");
    rated.rating = Some(6);
    let mut dated = item(2, "Dated");
    dated.release_date = Some("2001-01-01".to_string());
    let mut items = vec![rated, dated, item(3, "Plain")];

    sort(&mut items, SortKey::UserRating, SortOrder::Desc);
    assert_eq!(titles(&items), vec!["Rated", "Dated", "Plain"]);

    sort(&mut items, SortKey::ReleaseDate, SortOrder::Asc);
    assert_eq!(titles(&items), vec!["Rated", "Plain", "Dated"]);
  }

  #[test]
  fn test_default_sort_is_newest_first() {
    let mut items = vec![item(1, "First"), item(3, "Third"), item(2, "Second")];
    sort(&mut items, SortKey::default(), SortOrder::default());
    assert_eq!(titles(&items), vec!["Third", "Second", "First"]);
  }
}
