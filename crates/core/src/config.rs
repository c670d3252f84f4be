//! Application configuration handling.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::models::ConfigItem;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8787/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_CONFIG_FILE: &str = r#"# shelfside configuration
#
# api_base_url = "http://localhost:8787/api"
# request_timeout_secs = 10
"#;

/// Fallback recommendation buttons shown when the server has no config
/// saved yet; editable from the admin config tab.
pub static RECOMMENDATION_DEFAULTS: Lazy<Vec<ConfigItem>> = Lazy::new(|| {
    vec![
        ConfigItem {
            label: "오늘의 추천".to_string(),
            value: "#전략".to_string(),
            color: "#3498db".to_string(),
        },
        ConfigItem {
            label: "다 같이 한 판".to_string(),
            value: "#파티".to_string(),
            color: "#2ecc71".to_string(),
        },
        ConfigItem {
            label: "처음이신가요?".to_string(),
            value: "#입문".to_string(),
            color: "#f1c40f".to_string(),
        },
    ]
});

/// Settings for reaching the rental backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the persistence collaborator's HTTP API.
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Directory holding the user's config file.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shelfside")
    }

    /// Path of the TOML config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default file location, with
    /// `SHELFSIDE_*` environment variables taking precedence.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit file path.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("SHELFSIDE"))
            .build()
            .context("failed to assemble configuration")?;
        settings
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

/// Write a commented default config file on first run.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    if path.exists() {
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG_FILE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let temp = tempdir()?;
        let config = AppConfig::load_from(temp.path().join("missing.toml"))?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"https://club.example.org/api\"\nrequest_timeout_secs = 3\n",
        )?;
        let config = AppConfig::load_from(path)?;
        assert_eq!(config.api_base_url, "https://club.example.org/api");
        assert_eq!(config.request_timeout_secs, 3);
        Ok(())
    }

    #[test]
    fn recommendation_defaults_are_non_empty() {
        assert!(!RECOMMENDATION_DEFAULTS.is_empty());
        assert!(RECOMMENDATION_DEFAULTS
            .iter()
            .all(|item| !item.label.is_empty() && item.color.starts_with('#')));
    }
}
