//! Configuration management for chatstream.
//!
//! Loads configuration from `${CHATSTREAM_HOME}/config.toml` with sensible
//! defaults. The resolved values are handed to the transport and session
//! controller explicitly; nothing reads ambient state after construction.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config directory.
pub const HOME_ENV: &str = "CHATSTREAM_HOME";
/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "CHATSTREAM_BASE_URL";
/// Backend used when neither env nor config names one.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL (env `CHATSTREAM_BASE_URL` wins)
    pub base_url: Option<String>,

    /// Path of the streaming endpoint
    pub stream_path: String,

    /// Path of the health endpoint
    pub health_path: String,

    /// Number of retrieved sources to request (backend default when unset)
    pub k: Option<u32>,

    /// Ask the backend for debug payloads
    pub debug: bool,

    /// Ask the backend to send keepalives every N seconds
    pub heartbeat_secs: Option<u32>,

    /// Milliseconds between reveal ticks
    pub reveal_interval_ms: u64,

    /// Seconds without any frame before the stream is failed (0 disables)
    pub idle_timeout_secs: u64,

    /// Request timeout for the health probe in seconds
    pub health_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            stream_path: Self::DEFAULT_STREAM_PATH.to_string(),
            health_path: Self::DEFAULT_HEALTH_PATH.to_string(),
            k: None,
            debug: false,
            heartbeat_secs: None,
            reveal_interval_ms: Self::DEFAULT_REVEAL_INTERVAL_MS,
            idle_timeout_secs: Self::DEFAULT_IDLE_TIMEOUT_SECS,
            health_timeout_secs: Self::DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

impl Config {
    const DEFAULT_STREAM_PATH: &str = "/chat/stream";
    const DEFAULT_HEALTH_PATH: &str = "/health";
    const DEFAULT_REVEAL_INTERVAL_MS: u64 = 30;
    /// Default is disabled
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 0;
    const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 8;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or the
    /// file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the backend base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is not a valid absolute URL.
    pub fn effective_base_url(&self) -> Result<String> {
        resolve_base_url(
            std::env::var(BASE_URL_ENV).ok().as_deref(),
            self.base_url.as_deref(),
        )
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_secs))
        }
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs.max(1))
    }
}

/// Returns the chatstream home directory.
///
/// Checks `CHATSTREAM_HOME` first, falls back to `~/.config/chatstream`.
///
/// # Errors
/// Returns an error if no home directory can be determined.
pub fn chatstream_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|h| h.join(".config").join("chatstream"))
        .context("Could not determine home directory")
}

/// Returns the path to the config.toml file.
///
/// # Errors
/// Returns an error if no home directory can be determined.
pub fn config_path() -> Result<PathBuf> {
    Ok(chatstream_home()?.join("config.toml"))
}

fn resolve_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    let chosen = [env_url, config_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty());

    match chosen {
        Some(url) => {
            url::Url::parse(url).with_context(|| format!("Invalid chatstream base URL: {url}"))?;
            Ok(url.trim_end_matches('/').to_string())
        }
        None => Ok(DEFAULT_BASE_URL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.stream_path, "/chat/stream");
        assert_eq!(config.reveal_interval(), Duration::from_millis(30));
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "base_url = \"http://10.0.2.2:8000\"\nk = 5\nheartbeat_secs = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://10.0.2.2:8000"));
        assert_eq!(config.k, Some(5));
        assert_eq!(config.heartbeat_secs, Some(2));
        assert_eq!(config.health_path, "/health");
        assert!(!config.debug);
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "k = \"five\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_idle_timeout_zero_disables() {
        let config = Config {
            idle_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.idle_timeout(), None);

        let config = Config {
            idle_timeout_secs: 45,
            ..Default::default()
        };
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_reveal_interval_never_zero() {
        let config = Config {
            reveal_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.reveal_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_base_url_env_wins_over_config() {
        let url = resolve_base_url(Some("http://env.test:9000/"), Some("http://config.test")).unwrap();
        assert_eq!(url, "http://env.test:9000");
    }

    #[test]
    fn test_base_url_blank_env_falls_back_to_config() {
        let url = resolve_base_url(Some("  "), Some("http://config.test")).unwrap();
        assert_eq!(url, "http://config.test");
    }

    #[test]
    fn test_base_url_default() {
        assert_eq!(resolve_base_url(None, None).unwrap(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_invalid_rejected() {
        let err = resolve_base_url(None, Some("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid chatstream base URL"));
    }
}
