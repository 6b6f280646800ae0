//! Application configuration management.
//!
//! Holds the remote source credentials and the directory season stat
//! definitions are read from. Loaded from `~/.config/scoutsync/config.json`,
//! with the auth key overridable via the `SCOUTSYNC_AUTH_KEY` environment
//! variable (a local `.env` file is honored).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "scoutsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL of the remote authoritative source
const DEFAULT_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub auth_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory holding per-season stat definition files (`<year>.json`).
    #[serde(default)]
    pub stats_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> RemoteConfig {
        RemoteConfig {
            auth_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            stats_dir: None,
        }
    }
}

impl RemoteConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var("SCOUTSYNC_AUTH_KEY") {
            if !key.trim().is_empty() {
                config.auth_key = key;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: RemoteConfig = serde_json::from_str(r#"{"auth_key": "abc"}"#).unwrap();
        assert_eq!(config.auth_key, "abc");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 5);
        assert!(config.stats_dir.is_none());
    }
}
