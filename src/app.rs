use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::catalog::models::{MovieSummary, PaginatedResponse};
use crate::catalog::{BatchRequest, CatalogClient, SearchKind};
use crate::commands::{Command, DetailKind, ImageKind, ListArgs, MovieList, WatchlistCommand};
use crate::config::Config;
use crate::event::{self, ChangeBus};
use crate::session::SessionStore;
use crate::storage::SqliteStore;
use crate::watchlist::{self, Notice, NoticeLevel, WatchlistItem, WatchlistStore};

type Watchlist = WatchlistStore<CatalogClient, SqliteStore>;

/// Every long-lived component, built once and shared by handle.
pub struct App {
  config: Config,
  catalog: Arc<CatalogClient>,
  has_api_key: bool,
  storage: Arc<SqliteStore>,
  bus: ChangeBus,
  watchlist: Arc<Watchlist>,
  sessions: SessionStore<SqliteStore>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let api_key = config.api_key();
    let has_api_key = api_key.is_ok();
    if let Err(e) = &api_key {
      debug!(error = %e, "no catalog API key configured");
    }
    let catalog = Arc::new(CatalogClient::new(&config.catalog, api_key.unwrap_or_default())?);

    let path = config.storage_path()?;
    let storage = Arc::new(SqliteStore::open(&path)?.with_quota(config.storage.quota_bytes));
    let bus = ChangeBus::default();

    let watchlist = Arc::new(WatchlistStore::new(catalog.clone(), storage.clone(), bus.clone()));
    let sessions = SessionStore::new(storage.clone());

    info!(storage = %path.display(), "app initialized");
    Ok(Self {
      config,
      catalog,
      has_api_key,
      storage,
      bus,
      watchlist,
      sessions,
    })
  }

  fn require_api_key(&self) -> Result<()> {
    if self.has_api_key {
      Ok(())
    } else {
      // Re-run the lookup for its explanatory message
      self.config.api_key().map(|_| ())
    }
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Watchlist(command) => return self.run_watchlist(command).await,
      Command::Login { email, password } => {
        let session = self.sessions.login(&email, &password)?;
        println!("Welcome back, {}!", session.name);
        return Ok(());
      }
      Command::Register {
        name,
        email,
        password,
        confirm,
      } => {
        let session = self.sessions.register(&name, &email, &password, &confirm)?;
        println!("Welcome, {}!", session.name);
        return Ok(());
      }
      Command::Logout => {
        self.sessions.logout()?;
        println!("Signed out");
        return Ok(());
      }
      Command::Whoami => {
        match self.sessions.current()? {
          Some(session) => println!("{} <{}>", session.name, session.email),
          None => println!("Not signed in"),
        }
        return Ok(());
      }
      Command::Image { kind, path, size } => {
        let images = self.catalog.images();
        let url = match (kind, size) {
          (_, Some(size)) => images.url(Some(&path), &size),
          (ImageKind::Poster, None) => images.poster(Some(&path)),
          (ImageKind::Backdrop, None) => images.backdrop(Some(&path)),
          (ImageKind::Profile, None) => images.profile(Some(&path)),
        };
        println!("{}", url.ok_or_else(|| eyre!("Image path is empty"))?);
        return Ok(());
      }
      _ => {}
    }

    self.require_api_key()?;
    let catalog = &self.catalog;
    match command {
      Command::Trending { media, window, page } => {
        print_json(&catalog.trending(media, window, page).await?)
      }
      Command::Browse { list, page } => {
        let movies = match list {
          MovieList::Popular => catalog.popular(page).await?,
          MovieList::TopRated => catalog.top_rated(page).await?,
          MovieList::Upcoming => catalog.upcoming(page).await?,
          MovieList::NowPlaying => catalog.now_playing(page).await?,
        };
        print_movies(&movies);
        Ok(())
      }
      Command::Search(args) => {
        if args.is_advanced() {
          print_json(&catalog.advanced_search(&args.options()).await?)
        } else {
          match args.kind {
            SearchKind::Movie => {
              print_movies(&catalog.search_movies(&args.query, args.page).await?);
              Ok(())
            }
            SearchKind::Tv => print_json(&catalog.search_tv(&args.query, args.page).await?),
            SearchKind::Person => {
              print_json(&catalog.search_people(&args.query, args.page).await?)
            }
            SearchKind::Multi => print_json(&catalog.search_multi(&args.query, args.page).await?),
          }
        }
      }
      Command::Discover(args) => {
        if args.tv {
          print_json(&catalog.filtered_tv(&args.tv_filters(), args.page).await?)
        } else {
          print_movies(&catalog.filtered_movies(&args.movie_filters(), args.page).await?);
          Ok(())
        }
      }
      Command::Genre { id, tv, page } => {
        if tv {
          print_json(&catalog.tv_by_genre(id, page).await?)
        } else {
          print_movies(&catalog.movies_by_genre(id, page).await?);
          Ok(())
        }
      }
      Command::Starring { person_id, page } => {
        print_movies(&catalog.movies_by_actor(person_id, page).await?);
        Ok(())
      }
      Command::Language { code, page } => {
        print_movies(&catalog.movies_by_language(&code, page).await?);
        Ok(())
      }
      Command::Industry { industry, page } => {
        print_movies(&catalog.industry_movies(industry, page).await?);
        Ok(())
      }
      Command::Released { from, to, page } => {
        print_movies(&catalog.movies_by_date_range(&from, &to, page).await?);
        Ok(())
      }
      Command::Acclaimed { min_rating, page } => {
        print_movies(&catalog.high_rated_movies(min_rating, page).await?);
        Ok(())
      }
      Command::Details { kind, id } => match kind {
        DetailKind::Movie => print_json(&catalog.movie_details(id).await?),
        DetailKind::Tv => print_json(&catalog.tv_details(id).await?),
        DetailKind::Person => print_json(&catalog.person_details(id).await?),
      },
      Command::Credits { id, tv } => {
        let credits = if tv {
          catalog.tv_credits(id).await?
        } else {
          catalog.movie_credits(id).await?
        };
        print_json(&credits)
      }
      Command::Similar { id, page } => {
        print_movies(&catalog.similar_movies(id, page).await?);
        Ok(())
      }
      Command::Reviews { id, page } => print_json(&catalog.movie_reviews(id, page).await?),
      Command::Videos { id } => print_json(&catalog.movie_videos(id).await?),
      Command::Filmography { person_id } => print_json(&catalog.actor_movies(person_id).await?),
      Command::Genres { tv } => {
        let genres = if tv {
          catalog.tv_genres().await?
        } else {
          catalog.movie_genres().await?
        };
        for genre in genres {
          println!("{:>6}  {}", genre.id, genre.name);
        }
        Ok(())
      }
      Command::Configuration => print_json(&catalog.configuration().await?),
      Command::Batch { file, stats } => {
        let contents = std::fs::read_to_string(&file)
          .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
        let requests: Vec<BatchRequest> = serde_json::from_str(&contents)
          .map_err(|e| eyre!("Invalid batch file {}: {}", file.display(), e))?;

        print_json(&catalog.batch_requests(requests).await)?;
        if stats {
          print_json(&catalog.cache_stats())?;
        }
        Ok(())
      }
      Command::Watchlist(_)
      | Command::Login { .. }
      | Command::Register { .. }
      | Command::Logout
      | Command::Whoami
      | Command::Image { .. } => Ok(()),
    }
  }

  async fn run_watchlist(&self, command: WatchlistCommand) -> Result<()> {
    let store = &self.watchlist;
    let mut notices = store.notices();

    let result = match command {
      WatchlistCommand::List(args) => list(store, &args),
      WatchlistCommand::Add { id } => {
        self.require_api_key()?;
        store.add(id).await.map(drop).map_err(Into::into)
      }
      WatchlistCommand::Show { id } => match store.get_item(id) {
        Some(item) => print_json(&item),
        None => toggled(id, None),
      },
      WatchlistCommand::Edit(args) => found(args.id, store.update(args.id, args.update())?),
      WatchlistCommand::Remove { id } => {
        if !store.remove(id)? {
          println!("Movie {} is not in your watchlist", id);
        }
        Ok(())
      }
      WatchlistCommand::Watched { id } => toggled(id, store.toggle_watched(id)?),
      WatchlistCommand::Favorite { id } => toggled(id, store.toggle_favorite(id)?),
      WatchlistCommand::Rate { id, rating } => found(id, store.rate(id, rating)?),
      WatchlistCommand::Notes { id, text } => found(id, store.add_notes(id, &text)?),
      WatchlistCommand::Stats => print_json(&store.stats()),
      WatchlistCommand::Export { output } => {
        let path = output
          .unwrap_or_else(|| watchlist::export_file_name(chrono::Local::now().date_naive()).into());
        std::fs::write(&path, store.export_json()?)
          .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
        println!("Exported {} movies to {}", store.len(), path.display());
        Ok(())
      }
      WatchlistCommand::Import { file } => {
        let payload = std::fs::read_to_string(&file)
          .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
        store.import_snapshot(&payload).map(drop).map_err(Into::into)
      }
      WatchlistCommand::Backup => store.backup().map_err(Into::into),
      WatchlistCommand::Restore => store.restore().map(drop).map_err(Into::into),
      WatchlistCommand::Refresh { id } => {
        self.require_api_key()?;
        // Refreshing must not be served from earlier responses
        self.catalog.clear_cache();
        match id {
          Some(id) => found(id, store.refresh(id).await?),
          None => print_json(&store.refresh_all().await?),
        }
      }
      WatchlistCommand::Clear { yes } => {
        if !yes && !confirm(&format!("Remove all {} movies from your watchlist?", store.len()))? {
          println!("Aborted");
          return Ok(());
        }
        store.clear().map(drop).map_err(Into::into)
      }
      WatchlistCommand::Usage => print_json(&store.storage_usage()),
      WatchlistCommand::Watch => self.watch().await,
    };

    // A failure is reported once, by the returned error
    print_notices(&mut notices, result.is_err());
    result
  }

  /// Print the list each time another process writes it, until Ctrl-C.
  async fn watch(&self) -> Result<()> {
    let watcher = event::spawn_storage_watcher(
      self.storage.clone(),
      self.bus.clone(),
      self.config.storage.sync_interval(),
    );
    let sync = self.watchlist.spawn_sync();
    let subscription = self.watchlist.subscribe(|items| {
      println!("--- watchlist changed ({} movies)", items.len());
      print_items(items);
    });

    print_items(&self.watchlist.items());
    println!("Watching for changes, press Ctrl-C to stop");
    let stopped = tokio::signal::ctrl_c().await;

    self.watchlist.unsubscribe(subscription);
    sync.abort();
    watcher.abort();
    stopped.map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))
  }
}

fn list(store: &Watchlist, args: &ListArgs) -> Result<()> {
  let mut selected: HashSet<i64> = store.filter(&args.criteria()).iter().map(|i| i.id).collect();
  if let Some(query) = &args.search {
    let hits: HashSet<i64> = store.search(query).iter().map(|i| i.id).collect();
    selected.retain(|id| hits.contains(id));
  }

  let ordered = match args.ordering() {
    Some((key, order)) => store.sort(key, order),
    None => store.items(),
  };
  let items: Vec<WatchlistItem> = ordered
    .into_iter()
    .filter(|item| selected.contains(&item.id))
    .collect();

  if args.json {
    return print_json(&items);
  }
  if store.is_empty() {
    println!("Your watchlist is empty");
  } else if items.is_empty() {
    println!("No movies match");
  }
  print_items(&items);
  Ok(())
}

fn toggled(id: i64, state: Option<bool>) -> Result<()> {
  if state.is_none() {
    println!("Movie {} is not in your watchlist", id);
  }
  Ok(())
}

fn found(id: i64, present: bool) -> Result<()> {
  toggled(id, present.then_some(true))
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{} [y/N] ", prompt);
  io::stdout().flush()?;
  let mut answer = String::new();
  io::stdin().lock().read_line(&mut answer)?;
  Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_movies(page: &PaginatedResponse<MovieSummary>) {
  for movie in &page.results {
    let year = movie.release_date.as_deref().and_then(|d| d.get(..4)).unwrap_or("----");
    println!("{:>8}  {:<48} {}  {:.1}", movie.id, movie.title, year, movie.vote_average);
  }
  println!("page {}/{} ({} results)", page.page, page.total_pages, page.total_results);
}

fn print_items(items: &[WatchlistItem]) {
  for item in items {
    let flags = format!(
      "{}{}",
      if item.watched { 'W' } else { '-' },
      if item.favorite { '*' } else { '-' }
    );
    let rating = item.rating.map(|r| format!("{}/10", r)).unwrap_or_default();
    let year = item
      .release_year()
      .map(|y| y.to_string())
      .unwrap_or_else(|| "----".to_string());
    println!("{:>8}  {}  {:<48} {}  {:>5}", item.id, flags, item.title, year, rating);
  }
}

fn print_notices(notices: &mut broadcast::Receiver<Notice>, failed: bool) {
  for notice in drain_notices(notices, failed) {
    match notice.level {
      NoticeLevel::Error => eprintln!("error: {}", notice.message),
      NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice.message),
    }
  }
}

/// Queued notices worth printing. Error notices are dropped when `failed`,
/// since the same failure comes back as the command's error.
fn drain_notices(notices: &mut broadcast::Receiver<Notice>, failed: bool) -> Vec<Notice> {
  let mut drained = Vec::new();
  while let Ok(notice) = notices.try_recv() {
    if failed && notice.level == NoticeLevel::Error {
      continue;
    }
    drained.push(notice);
  }
  drained
}
