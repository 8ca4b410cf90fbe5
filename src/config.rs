use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub search: SearchConfig,
  pub ui: UiConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Base URL of the issue tracker; endpoints live under `/api`
  pub base_url: String,
  /// Per-request transport timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long fetched data is served without refetching (0 = always refetch)
  pub stale_time_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  /// Keep showing the search branch after the search term is cleared
  pub sticky_results: bool,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      sticky_results: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  pub tick_rate_ms: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self { tick_rate_ms: 250 }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Default filter when RUST_LOG is not set
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./issuedeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/issuedeck/config.yaml
  ///
  /// Without a file, defaults are used. `ISSUEDECK_API_URL` overrides the
  /// configured base URL.
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
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("ISSUEDECK_API_URL") {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("issuedeck.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("issuedeck").join("config.yaml");
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
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.stale_time_secs as i64)
  }

  pub fn tick_rate(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.ui.tick_rate_ms)
  }

  /// Directory for log files.
  pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("issuedeck").join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:3000");
    assert_eq!(config.cache.stale_time_secs, 0);
    assert!(config.search.sticky_results);
    assert_eq!(config.tick_rate(), std::time::Duration::from_millis(250));
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_partial_file() {
    let config = Config::parse(
      "api:\n  base_url: https://tracker.example.com\nsearch:\n  sticky_results: false\n",
    )
    .unwrap();
    assert_eq!(config.api.base_url, "https://tracker.example.com");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(!config.search.sticky_results);
  }

  #[test]
  fn test_stale_time() {
    let config = Config::parse("cache:\n  stale_time_secs: 90\n").unwrap();
    assert_eq!(config.stale_time(), chrono::Duration::seconds(90));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/issuedeck.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
