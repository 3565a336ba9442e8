use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    gateway::{DEFAULT_BASE_URL, DEFAULT_MODEL, GatewayConfig},
    location::Coordinates,
    model::TemperatureUnit,
};

/// Environment variables checked for the API key, highest priority first.
pub const API_KEY_VARS: &[&str] = &["ATMOS_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// model = "gemini-3-flash-preview"
/// unit = "fahrenheit"
///
/// [home]
/// latitude = 12.97
/// longitude = 80.04
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub unit: TemperatureUnit,
    /// Position used for location detection when the host offers none.
    pub home: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            unit: TemperatureUnit::default(),
            home: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load from disk, then let the process environment (and `.env`) supply the API key.
    pub fn load_with_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "Ignoring unreadable .env file");
            }
        }

        let mut cfg = Self::load()?;
        cfg.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "atmos", "atmos-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Replace the API key with the first non-empty variable from [`API_KEY_VARS`].
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = API_KEY_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()).map(|v| (*name, v)));

        if let Some((name, key)) = from_env {
            tracing::debug!(var = name, "Using API key from environment");
            self.api_key = Some(key.trim().to_string());
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        let trimmed = api_key.trim();
        self.api_key = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Immutable settings for the model gateway. A missing key becomes an
    /// empty one; the provider rejects it at call time.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.api_key.clone().unwrap_or_default())
            .with_model(self.model.clone())
            .with_base_url(self.base_url.clone())
    }
}
