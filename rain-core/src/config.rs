use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Settings for the prediction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. "0.0.0.0:8000".
    pub bind: String,

    /// Path to the XGBoost JSON model artifact.
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8000".to_string(), model_path: PathBuf::from("rain_model.json") }
    }
}

/// Settings for callers of the prediction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub health_timeout_secs: u64,
    pub predict_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { api_url: "http://localhost:8000".to_string(), health_timeout_secs: 2, predict_timeout_secs: 5 }
    }
}

impl ClientConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn predict_timeout(&self) -> Duration {
        Duration::from_secs(self.predict_timeout_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [server]
/// bind = "0.0.0.0:8000"
/// model_path = "rain_model.json"
///
/// [client]
/// api_url = "http://localhost:8000"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from an explicit path, or defaults if it doesn't exist.
    /// Values are not validated here so a bad file can still be reconfigured.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config, creating parent directories as needed.
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
        let dirs = ProjectDirs::from("dev", "rain-predict", "rain")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.client.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!(
                "Invalid api_url '{url}': expected an http:// or https:// URL.\n\
                 Hint: run `rain configure` to fix it."
            ));
        }
        if self.client.health_timeout_secs == 0 || self.client.predict_timeout_secs == 0 {
            return Err(anyhow!("Client timeouts must be at least one second"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_layout() {
        let cfg = Config::default();

        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert_eq!(cfg.server.model_path, PathBuf::from("rain_model.json"));
        assert_eq!(cfg.client.api_url, "http://localhost:8000");
        assert_eq!(cfg.client.health_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.client.predict_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nmodel_path = \"/srv/models/rain.json\"\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.server.model_path, PathBuf::from("/srv/models/rain.json"));
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert_eq!(cfg.client, ClientConfig::default());
    }

    #[test]
    fn save_then_load_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.client.api_url = "http://weather-box:9000".to_string();
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn invalid_url_loads_but_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[client]\napi_url = \"localhost:8000\"\n").unwrap();

        let mut cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.client.api_url, "localhost:8000");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid api_url"));

        // Reconfiguring replaces the bad value and the file saves cleanly.
        cfg.client.api_url = "http://rain.internal:8000".to_string();
        cfg.validate().unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        cfg.client.predict_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
