use crate::cache::CachePolicy;
use crate::catalog::pagination::PageSize;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `api.url`
pub const API_URL_ENV: &str = "P9S_API_URL";

const DEFAULT_API_URL: &str = "https://dummyjson.com";

/// Cache windows above this are capped
const MAX_WINDOW_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  pub pagination: PaginationConfig,
  pub cache: CacheConfig,
  pub search: SearchConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
  /// Rejected at load unless it is one of the offered page sizes
  pub default_page_size: PageSize,
}

/// Staleness and garbage-collection windows, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub list_stale_secs: u64,
  pub list_gc_secs: u64,
  pub product_stale_secs: u64,
  pub product_gc_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      list_stale_secs: 5 * 60,
      list_gc_secs: 10 * 60,
      product_stale_secs: 30 * 60,
      product_gc_secs: 60 * 60,
    }
  }
}

impl CacheConfig {
  pub fn list_policy(&self) -> CachePolicy {
    CachePolicy::new(window(self.list_stale_secs), window(self.list_gc_secs))
  }

  pub fn product_policy(&self) -> CachePolicy {
    CachePolicy::new(window(self.product_stale_secs), window(self.product_gc_secs))
  }
}

fn window(secs: u64) -> chrono::Duration {
  chrono::Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  /// Quiet period before a typed search is applied
  pub debounce_ms: u64,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self { debounce_ms: 500 }
  }
}

impl SearchConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset
  pub level: String,
  /// Directory for the rolling log files
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      dir: None,
    }
  }
}

impl LogConfig {
  /// Configured directory, or `<data_dir>/p9s/logs`
  pub fn dir(&self) -> PathBuf {
    self.dir.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("p9s")
        .join("logs")
    })
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./p9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/p9s/config.yaml
  ///
  /// With no file anywhere the defaults are used. `P9S_API_URL` overrides
  /// `api.url` either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        config.api.url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("p9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("p9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to an empty map
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Header title: the configured one, else the API host
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| u.host_str().map(str::to_string))
      .unwrap_or_else(|| self.api.url.clone())
  }
}
