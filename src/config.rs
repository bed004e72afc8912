use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheOptions;

pub const BASE_URL_ENV: &str = "ROSTER_API_BASE_URL";
pub const TOKEN_ENV: &str = "ROSTER_AUTH_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Write logs here instead of stderr
  pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Per-request timeout in milliseconds
  pub timeout_ms: u64,
  /// Where the session handler is pointed when the server answers 401
  pub login_path: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000/api".to_string(),
      timeout_ms: 10_000,
      login_path: "/login".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub stale_secs: u64,
  pub gc_secs: u64,
  /// How often idle entries are swept
  pub collect_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    let defaults = CacheOptions::default();
    Self {
      stale_secs: defaults.stale_time.as_secs(),
      gc_secs: defaults.gc_time.as_secs(),
      collect_secs: 60,
    }
  }
}

impl CacheConfig {
  pub fn options(&self) -> CacheOptions {
    CacheOptions {
      stale_time: Duration::from_secs(self.stale_secs),
      gc_time: Duration::from_secs(self.gc_secs),
    }
  }

  pub fn collect_interval(&self) -> Duration {
    Duration::from_secs(self.collect_secs.max(1))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./roster.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/roster/config.yaml
  ///
  /// Falls back to defaults when no file exists. `ROSTER_API_BASE_URL`
  /// overrides the base url either way.
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

    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
      if !base_url.trim().is_empty() {
        config.api.base_url = base_url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("roster.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("roster").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get an auth token from the environment, if one is set.
  pub fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV)
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
