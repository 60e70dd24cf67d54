use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "SKYINTEL_API_URL";

/// Base URL used when no config file or override names one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub query: QueryConfig,
  #[serde(default)]
  pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Whole-request timeout; none by default
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryConfig {
  /// Serve cached data for this long before refetching on the next observe
  pub stale_time_secs: Option<u64>,
  /// Refetch the observed range on this period
  pub refetch_interval_secs: Option<u64>,
  /// Bound on cached keys; unbounded when absent
  pub max_entries: Option<usize>,
}

/// Initial date range of the dashboard, `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DashboardConfig {
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

impl DashboardConfig {
  /// Dates must be `YYYY-MM-DD` and the range must not end before it starts.
  /// Blank values mean no bound.
  fn validate(&self) -> Result<()> {
    let start = parse_date("dashboard.start_date", self.start_date.as_deref())?;
    let end = parse_date("dashboard.end_date", self.end_date.as_deref())?;
    if let (Some(start), Some(end)) = (start, end) {
      if end < start {
        return Err(Error::Config(format!(
          "dashboard range ends before it starts: {} > {}",
          start, end
        )));
      }
    }
    Ok(())
  }
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
  let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
    return Ok(None);
  };
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map(Some)
    .map_err(|_| {
      Error::Config(format!(
        "invalid {} {:?}, expected YYYY-MM-DD",
        field, value
      ))
    })
}

impl Config {
  /// Load configuration from file, then apply the environment override.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./skyintel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/skyintel/config.yaml
  ///
  /// Without a file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = match explicit_path {
      Some(p) if p.exists() => Some(p.to_path_buf()),
      Some(p) => {
        return Err(Error::Config(format!(
          "Config file not found: {}",
          p.display()
        )))
      }
      None => Self::find_config_file(),
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.apply_api_url(&url);
    }
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("skyintel.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("skyintel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Config(format!(
        "Failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::from_yaml(&contents).map_err(|e| match e {
      Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
      other => other,
    })
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // an empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Self = serde_yaml::from_str(contents)
      .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    config.dashboard.validate()?;
    Ok(config)
  }

  /// Override the base URL; blank values are ignored.
  pub fn apply_api_url(&mut self, url: &str) {
    let url = url.trim();
    if !url.is_empty() {
      self.api.base_url = url.to_string();
    }
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.api.timeout_secs.map(Duration::from_secs)
  }

  pub fn stale_time(&self) -> Option<Duration> {
    self.query.stale_time_secs.map(Duration::from_secs)
  }

  pub fn refetch_interval(&self) -> Option<Duration> {
    self
      .query
      .refetch_interval_secs
      .filter(|secs| *secs > 0)
      .map(Duration::from_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert_eq!(config.stale_time(), None);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: https://api.skyintel.example/v1
  timeout_secs: 30
query:
  stale_time_secs: 300
  refetch_interval_secs: 60
  max_entries: 64
dashboard:
  start_date: "2024-01-01"
  end_date: "2024-01-31"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.base_url, "https://api.skyintel.example/v1");
    assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.stale_time(), Some(Duration::from_secs(300)));
    assert_eq!(config.refetch_interval(), Some(Duration::from_secs(60)));
    assert_eq!(config.query.max_entries, Some(64));
    assert_eq!(config.dashboard.start_date.as_deref(), Some("2024-01-01"));
  }

  #[test]
  fn test_partial_api_section_keeps_default_url() {
    let config = Config::from_yaml("api:\n  timeout_secs: 5\n").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_API_URL);
  }

  #[test]
  fn test_zero_interval_disables_polling() {
    let config = Config::from_yaml("query:\n  refetch_interval_secs: 0\n").unwrap();
    assert_eq!(config.refetch_interval(), None);
  }

  #[test]
  fn test_invalid_yaml() {
    let err = Config::from_yaml("api: [").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn test_invalid_dashboard_dates() {
    let err = Config::from_yaml("dashboard:\n  start_date: \"2024-13-01\"\n").unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("dashboard.start_date")));

    let err = Config::from_yaml("dashboard:\n  end_date: \"01/31/2024\"\n").unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("dashboard.end_date")));

    let reversed = "dashboard:\n  start_date: \"2024-02-01\"\n  end_date: \"2024-01-01\"\n";
    assert!(matches!(
      Config::from_yaml(reversed),
      Err(Error::Config(ref msg)) if msg.contains("ends before it starts")
    ));
  }

  #[test]
  fn test_blank_dashboard_dates_are_unbounded() {
    let config = Config::from_yaml("dashboard:\n  start_date: \"\"\n").unwrap();
    assert_eq!(config.dashboard.start_date.as_deref(), Some(""));
    assert_eq!(config.dashboard.end_date, None);
  }

  #[test]
  fn test_api_url_override() {
    let mut config = Config::default();
    config.apply_api_url("  ");
    assert_eq!(config.api.base_url, DEFAULT_API_URL);
    config.apply_api_url("http://10.0.0.5:8000");
    assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/skyintel.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
