use serde::Serialize;

use super::item::WatchlistItem;

const TOP_GENRES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStats {
  pub total: usize,
  pub watched: usize,
  pub unwatched: usize,
  pub favorites: usize,
  pub rated: usize,
  /// Mean user rating over rated items, one decimal ("0.0" when none)
  pub average_rating: String,
  pub top_genres: Vec<GenreCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
  pub name: String,
  pub count: usize,
}

impl WatchlistStats {
  pub fn compute(items: &[WatchlistItem]) -> Self {
    let total = items.len();
    let watched = items.iter().filter(|i| i.watched).count();
    let favorites = items.iter().filter(|i| i.favorite).count();
    let ratings: Vec<u32> = items.iter().filter_map(|i| i.rating).map(u32::from).collect();

    let average = if ratings.is_empty() {
      0.0
    } else {
      f64::from(ratings.iter().sum::<u32>()) / ratings.len() as f64
    };

    Self {
      total,
      watched,
      unwatched: total - watched,
      favorites,
      rated: ratings.len(),
      average_rating: format!("{:.1}", average),
      top_genres: top_genres(items),
    }
  }
}

/// Most common genre names, ties in first-seen order.
fn top_genres(items: &[WatchlistItem]) -> Vec<GenreCount> {
  let mut counts: Vec<GenreCount> = Vec::new();
  for genre in items.iter().flat_map(|i| &i.genres) {
    match counts.iter_mut().find(|c| c.name == genre.name) {
      Some(entry) => entry.count += 1,
      None => counts.push(GenreCount {
        name: genre.name.clone(),
        count: 1,
      }),
    }
  }

  // sort_by is stable, so equal counts keep first-seen order
  counts.sort_by(|a, b| b.count.cmp(&a.count));
  counts.truncate(TOP_GENRES);
  counts
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::watchlist::item::fixtures::{genre, item};
  use pretty_assertions::assert_eq;

  #[test]
  fn test_empty_stats() {
    assert_eq!(
      WatchlistStats::compute(&[]),
      WatchlistStats {
        total: 0,
        watched: 0,
        unwatched: 0,
        favorites: 0,
        rated: 0,
        average_rating: "0.0".to_string(),
        top_genres: vec![],
      }
    );
  }

  #[test]
  fn test_counts_and_average() {
    let mut a = item(1, "A");
    a.watched = true;
    a.rating = Some(9);
    let mut b = item(2, "B");
    b.favorite = true;
    b.rating = Some(6);
    let mut c = item(3, "C");
    c.rating = Some(8);

    let stats = WatchlistStats::compute(&[a, b, c, item(4, "D")]);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.watched, 1);
    assert_eq!(stats.unwatched, 3);
    assert_eq!(stats.favorites, 1);
    assert_eq!(stats.rated, 3);
    assert_eq!(stats.average_rating, "7.7");
  }

  #[test]
  fn test_top_genres_limited_and_ordered() {
    let names = ["Drama", "Action", "Comedy", "Horror", "Crime", "Sci-Fi"];
    let mut items = Vec::new();
    for (i, name) in names.iter().enumerate() {
      let mut it = item(i as i64, name);
      it.genres = vec![genre(i as i64, name)];
      items.push(it);
    }
    // Action appears twice
    items[0].genres.push(genre(1, "Action"));

    let top = WatchlistStats::compute(&items).top_genres;
    let order: Vec<(&str, usize)> = top.iter().map(|g| (g.name.as_str(), g.count)).collect();
    assert_eq!(
      order,
      vec![("Action", 2), ("Drama", 1), ("Comedy", 1), ("Horror", 1), ("Crime", 1)]
    );
  }

  #[test]
  fn test_serializes_camel_case() {
    let value = serde_json::to_value(WatchlistStats::compute(&[])).unwrap();
    assert_eq!(value["averageRating"], "0.0");
    assert!(value["topGenres"].as_array().unwrap().is_empty());
  }
}
