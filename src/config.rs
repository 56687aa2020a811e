use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub catalog: CatalogConfig,
  #[serde(default)]
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
  pub base_url: String,
  pub image_base_url: String,
  /// Response language sent with every request (e.g., "en-US")
  pub language: Option<String>,
  /// Fallback when no API key is set in the environment
  pub api_key: Option<String>,
  pub timeout_secs: u64,
  pub cache_ttl_secs: u64,
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.themoviedb.org/3".to_string(),
      image_base_url: "https://image.tmdb.org/t/p/".to_string(),
      language: None,
      api_key: None,
      timeout_secs: 15,
      cache_ttl_secs: 300,
    }
  }
}

impl CatalogConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Database file (default: $XDG_DATA_HOME/cineverse/storage.db)
  pub path: Option<PathBuf>,
  /// Maximum bytes of stored values; writes beyond it fail
  pub quota_bytes: Option<usize>,
  /// How often `watchlist watch` checks for writes from other processes
  pub sync_interval_ms: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      path: None,
      quota_bytes: None,
      sync_interval_ms: 1000,
    }
  }
}

impl StorageConfig {
  pub fn sync_interval(&self) -> Duration {
    Duration::from_millis(self.sync_interval_ms.max(10))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cineverse.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cineverse/config.yaml
  ///
  /// Without a file every setting takes its default.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        debug!("no config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cineverse.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cineverse").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Get the catalog API key.
  ///
  /// Checks CINEVERSE_API_KEY first, then TMDB_API_KEY, then `catalog.api_key`.
  pub fn api_key(&self) -> Result<String> {
    std::env::var("CINEVERSE_API_KEY")
      .or_else(|_| std::env::var("TMDB_API_KEY"))
      .ok()
      .or_else(|| self.catalog.api_key.clone())
      .filter(|key| !key.trim().is_empty())
      .ok_or_else(|| {
        eyre!("Catalog API key not found. Set CINEVERSE_API_KEY or TMDB_API_KEY, or catalog.api_key in the config file.")
      })
  }

  /// Directory for the database and log files.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("cineverse"))
  }

  pub fn storage_path(&self) -> Result<PathBuf> {
    match &self.storage.path {
      Some(path) => Ok(path.clone()),
      None => Ok(Self::data_dir()?.join("storage.db")),
    }
  }
}
