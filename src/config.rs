//! Client configuration with persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mpd::{ConnectionOptions, DEFAULT_PORT};

const CONFIG_DIR: &str = "mpdremote";
const CONFIG_FILE: &str = "config.json";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
  /// Hostname, IP address or absolute path of a local socket.
  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_port")]
  pub port: u16,

  #[serde(default)]
  pub password: Option<String>,

  /// Quiet period before entering idle mode, in milliseconds.
  #[serde(default = "default_idle_delay_ms")]
  pub idle_delay_ms: u64,

  /// Wait for each response line, in milliseconds.
  #[serde(default = "default_response_timeout_ms")]
  pub response_timeout_ms: u64,

  /// Connection events buffered for a slow consumer.
  #[serde(default = "default_event_capacity")]
  pub event_capacity: usize,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_port() -> u16 {
  DEFAULT_PORT
}

fn default_idle_delay_ms() -> u64 {
  500
}

fn default_response_timeout_ms() -> u64 {
  5000
}

fn default_event_capacity() -> usize {
  64
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      password: None,
      idle_delay_ms: default_idle_delay_ms(),
      response_timeout_ms: default_response_timeout_ms(),
      event_capacity: default_event_capacity(),
    }
  }
}

impl ClientConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.host.trim().is_empty() {
      return Err("Host cannot be empty".to_string());
    }
    if self.port == 0 {
      return Err("Port must be between 1 and 65535".to_string());
    }
    if self.response_timeout_ms == 0 {
      return Err("Response timeout must be positive".to_string());
    }
    if self.event_capacity == 0 {
      return Err("Event capacity must be positive".to_string());
    }
    Ok(())
  }

  pub fn connection_options(&self) -> ConnectionOptions {
    ConnectionOptions {
      idle_delay: Duration::from_millis(self.idle_delay_ms),
      response_timeout: Duration::from_millis(self.response_timeout_ms),
      event_capacity: self.event_capacity,
    }
  }

  /// `<config dir>/mpdremote/config.json`, if the platform has a config dir.
  pub fn path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
  }

  /// Load the stored config, or defaults when there is none or it is unusable.
  pub fn load() -> Self {
    match Self::path() {
      Some(path) if path.exists() => Self::load_from(&path),
      _ => Self::default(),
    }
  }

  fn load_from(path: &Path) -> Self {
    let config = fs::read_to_string(path)
      .map_err(|e| e.to_string())
      .and_then(|text| Self::from_json(&text));
    match config {
      Ok(config) => {
        log::debug!("Loaded config from {}", path.display());
        config
      }
      Err(e) => {
        log::warn!("Ignoring config {}: {}", path.display(), e);
        Self::default()
      }
    }
  }

  /// Parse and validate a JSON config.
  pub fn from_json(text: &str) -> Result<Self, String> {
    let config: Self = serde_json::from_str(text).map_err(|e| e.to_string())?;
    config.validate()?;
    Ok(config)
  }

  pub fn save(&self) -> Result<(), String> {
    self.validate()?;
    let path = Self::path().ok_or_else(|| "No config directory on this platform".to_string())?;
    if let Some(dir) = path.parent() {
      fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    }
    let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
    fs::write(&path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    log::info!("Saved config to {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_fill_missing_fields() {
    let config = ClientConfig::from_json(r#"{"host": "music.lan", "idleDelayMs": 250}"#).unwrap();
    assert_eq!(config.host, "music.lan");
    assert_eq!(config.port, 6600);
    assert_eq!(config.password, None);
    assert_eq!(config.idle_delay_ms, 250);
    assert_eq!(config.response_timeout_ms, 5000);

    let options = config.connection_options();
    assert_eq!(options.idle_delay, Duration::from_millis(250));
    assert_eq!(options.response_timeout, Duration::from_secs(5));
    assert_eq!(options.event_capacity, 64);
  }

  #[test]
  fn test_serializes_camel_case() {
    let json = serde_json::to_value(ClientConfig::default()).unwrap();
    assert_eq!(json["responseTimeoutMs"], 5000);
    assert_eq!(json["eventCapacity"], 64);
    assert!(json["password"].is_null());
  }

  #[test]
  fn test_validate() {
    assert!(ClientConfig::default().validate().is_ok());

    let mut config = ClientConfig::default();
    config.host = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.port = 0;
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.response_timeout_ms = 0;
    assert!(config.validate().is_err());

    assert!(ClientConfig::from_json(r#"{"port": 0}"#).is_err());
    assert!(ClientConfig::from_json("not json").is_err());
  }
}
