use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub backend: BackendConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  /// Bundled fixture data served from memory
  #[default]
  Mock,
  /// A remote backend speaking JSON over HTTP
  Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
  pub kind: BackendKind,
  /// Base URL, required for the http backend
  pub url: Option<String>,
  /// Artificial delay added to every mock call
  pub latency_ms: u64,
  /// Transactions per page served by the mock backend
  pub page_size: usize,
  /// Fixture file replacing the bundled mock data
  pub data_file: Option<PathBuf>,
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self {
      kind: BackendKind::Mock,
      url: None,
      latency_ms: 300,
      page_size: DEFAULT_PAGE_SIZE,
      data_file: None,
    }
  }
}

impl BackendConfig {
  pub fn latency(&self) -> Duration {
    Duration::from_millis(self.latency_ms)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Directory for the log file (default: $XDG_DATA_HOME/txreview)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./txreview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/txreview/config.yaml
  ///
  /// Without an explicit path and with no file found, defaults are used.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("txreview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("txreview").join("config.yaml");
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

  pub fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }
}
