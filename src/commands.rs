//! Command line surface.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::catalog::{Industry, MediaType, MovieFilters, SearchKind, SearchOptions, TimeWindow, TvFilters};
use crate::watchlist::{FilterCriteria, ItemUpdate, SortKey, SortOrder};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Trending movies, shows or people
  Trending {
    #[arg(value_enum, default_value = "movie")]
    media: MediaType,
    #[arg(value_enum, default_value = "day")]
    window: TimeWindow,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Curated movie lists
  Browse {
    #[arg(value_enum)]
    list: MovieList,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Search the catalog
  Search(SearchArgs),

  /// Discover movies or shows matching every given filter
  Discover(DiscoverArgs),

  /// Popular movies or shows in one genre
  Genre {
    /// Genre id (see `genres`)
    id: i64,
    #[arg(long)]
    tv: bool,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Popular movies featuring a person
  Starring {
    person_id: i64,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Popular movies in an original language (ISO 639-1, e.g. "ko")
  Language {
    code: String,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Popular movies from a regional film industry
  Industry {
    #[arg(value_enum)]
    industry: Industry,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Movies released between two dates (YYYY-MM-DD)
  Released {
    from: String,
    to: String,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Highest rated movies with at least 1000 votes
  Acclaimed {
    #[arg(long, default_value_t = 8.0)]
    min_rating: f64,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Full details for one title or person
  Details {
    #[arg(value_enum)]
    kind: DetailKind,
    id: i64,
  },

  /// Cast and crew of a movie or show
  Credits {
    id: i64,
    #[arg(long)]
    tv: bool,
  },

  /// Movies similar to a movie
  Similar {
    id: i64,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Reviews of a movie
  Reviews {
    id: i64,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },

  /// Trailers and clips of a movie
  Videos { id: i64 },

  /// Movies a person acted in
  Filmography { person_id: i64 },

  /// Genre list
  Genres {
    #[arg(long)]
    tv: bool,
  },

  /// Catalog configuration (image sizes, base URLs)
  Configuration,

  /// Image URL for a poster, backdrop or profile path
  Image {
    #[arg(value_enum)]
    kind: ImageKind,
    path: String,
    /// Size token (e.g., w342); defaults per kind
    #[arg(long)]
    size: Option<String>,
  },

  /// Run catalog requests from a JSON file concurrently
  Batch {
    /// File holding `[{"endpoint": "/movie/popular", "params": {"page": "1"}}, ...]`
    file: PathBuf,
    /// Print cache statistics afterwards
    #[arg(long)]
    stats: bool,
  },

  /// Manage your watchlist
  #[command(subcommand)]
  Watchlist(WatchlistCommand),

  /// Sign in (display only, nothing is verified)
  Login { email: String, password: String },

  /// Create a local profile (display only)
  Register {
    name: String,
    email: String,
    password: String,
    confirm: String,
  },

  Logout,

  /// Show who is signed in
  Whoami,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovieList {
  Popular,
  TopRated,
  Upcoming,
  NowPlaying,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailKind {
  Movie,
  Tv,
  Person,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
  Poster,
  Backdrop,
  Profile,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
  pub query: String,
  #[arg(short, long, value_enum, default_value = "movie")]
  pub kind: SearchKind,
  #[arg(short, long, default_value_t = 1)]
  pub page: u32,
  #[arg(long)]
  pub year: Option<i32>,
  #[arg(long)]
  pub region: Option<String>,
  #[arg(long)]
  pub include_adult: bool,
}

impl SearchArgs {
  pub fn options(&self) -> SearchOptions {
    SearchOptions {
      query: self.query.clone(),
      kind: self.kind,
      page: self.page,
      include_adult: self.include_adult,
      year: self.year,
      region: self.region.clone(),
    }
  }

  /// Whether any extra beyond the query and page was given.
  pub fn is_advanced(&self) -> bool {
    self.year.is_some() || self.region.is_some() || self.include_adult
  }
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
  /// Discover TV shows instead of movies
  #[arg(long)]
  pub tv: bool,
  #[arg(long)]
  pub genre: Option<i64>,
  #[arg(long)]
  pub year: Option<i32>,
  /// Minimum vote average
  #[arg(long)]
  pub rating: Option<f64>,
  #[arg(long)]
  pub language: Option<String>,
  #[arg(long)]
  pub region: Option<String>,
  /// Person id in the cast
  #[arg(long)]
  pub actor: Option<i64>,
  /// Person id in the crew
  #[arg(long)]
  pub director: Option<i64>,
  #[arg(short, long, default_value_t = 1)]
  pub page: u32,
}

impl DiscoverArgs {
  pub fn movie_filters(&self) -> MovieFilters {
    MovieFilters {
      genre: self.genre,
      year: self.year,
      rating: self.rating,
      language: self.language.clone(),
      region: self.region.clone(),
      actor: self.actor,
      director: self.director,
    }
  }

  pub fn tv_filters(&self) -> TvFilters {
    TvFilters {
      genre: self.genre,
      year: self.year,
      rating: self.rating,
      language: self.language.clone(),
    }
  }
}

#[derive(Subcommand, Debug)]
pub enum WatchlistCommand {
  /// List saved movies
  #[command(alias = "ls")]
  List(ListArgs),

  /// Save a movie by catalog id
  Add { id: i64 },

  /// Print one saved movie as JSON
  Show { id: i64 },

  /// Change several fields of a saved movie at once
  Edit(EditArgs),

  #[command(alias = "rm")]
  Remove { id: i64 },

  /// Toggle watched
  Watched { id: i64 },

  /// Toggle favorite
  Favorite { id: i64 },

  /// Rate from 1 to 10
  Rate {
    id: i64,
    #[arg(allow_negative_numbers = true)]
    rating: i64,
  },

  /// Replace an item's notes
  Notes { id: i64, text: String },

  Stats,

  /// Write the list to a JSON file
  Export {
    /// Destination (default: cineverse-watchlist-YYYY-MM-DD.json)
    output: Option<PathBuf>,
  },

  /// Merge movies from an exported JSON file
  Import { file: PathBuf },

  /// Save a copy of the list in the backup slot
  Backup,

  /// Replace the list with the backup
  Restore,

  /// Re-fetch catalog details for one item, or all of them
  Refresh { id: Option<i64> },

  /// Remove every item
  Clear {
    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,
  },

  /// Stored size of the list
  Usage,

  /// Print the list whenever another process changes it
  Watch,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
  /// Case-insensitive match on title, overview and genres
  #[arg(short, long)]
  pub search: Option<String>,
  #[arg(long, value_enum)]
  pub sort: Option<SortKey>,
  #[arg(long, value_enum)]
  pub order: Option<SortOrder>,
  #[arg(long)]
  pub watched: Option<bool>,
  #[arg(long)]
  pub favorite: Option<bool>,
  /// Genre id
  #[arg(long)]
  pub genre: Option<i64>,
  /// Minimum catalog vote average
  #[arg(long)]
  pub min_rating: Option<f64>,
  #[arg(long)]
  pub year: Option<i32>,
  /// Print JSON instead of a table
  #[arg(long)]
  pub json: bool,
}

impl ListArgs {
  pub fn criteria(&self) -> FilterCriteria {
    FilterCriteria {
      watched: self.watched,
      favorite: self.favorite,
      genre: self.genre,
      min_rating: self.min_rating,
      year: self.year,
    }
  }

  /// Requested ordering, if either half was given.
  pub fn ordering(&self) -> Option<(SortKey, SortOrder)> {
    if self.sort.is_none() && self.order.is_none() {
      return None;
    }
    Some((self.sort.unwrap_or_default(), self.order.unwrap_or_default()))
  }
}

#[derive(Args, Debug)]
pub struct EditArgs {
  pub id: i64,
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub watched: Option<bool>,
  #[arg(long)]
  pub favorite: Option<bool>,
  /// Rating from 1 to 10
  #[arg(long, conflicts_with = "unrate")]
  pub rating: Option<u8>,
  /// Remove the rating
  #[arg(long)]
  pub unrate: bool,
  #[arg(long)]
  pub notes: Option<String>,
}

impl EditArgs {
  pub fn update(&self) -> ItemUpdate {
    let rating = if self.unrate {
      Some(None)
    } else {
      self.rating.map(Some)
    };

    ItemUpdate {
      title: self.title.clone(),
      watched: self.watched,
      favorite: self.favorite,
      rating,
      notes: self.notes.clone(),
      ..ItemUpdate::default()
    }
  }
}
