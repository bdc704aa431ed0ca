//! Runtime configuration.
//!
//! Read from `retouch.toml` in the platform config directory, with
//! `RETOUCH_PROCESSOR_URL` taking precedence over the file for the URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::RetouchError;
use crate::processor::OneShot;

pub const CONFIG_FILE_NAME: &str = "retouch.toml";
pub const PROCESSOR_URL_ENV: &str = "RETOUCH_PROCESSOR_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetouchConfig {
    /// Base URL of the processing service.
    pub processor_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Upper bound on how long an undo/redo may hold the replay guard if
    /// its round trip never resolves.
    pub settle_timeout_secs: u64,
    pub clahe_clip_limit: f64,
    pub clahe_tile_grid_size: u32,
    pub s_curve_intensity: f64,
}

impl Default for RetouchConfig {
    fn default() -> Self {
        Self {
            processor_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            settle_timeout_secs: 60,
            clahe_clip_limit: 2.0,
            clahe_tile_grid_size: 8,
            s_curve_intensity: 0.5,
        }
    }
}

impl RetouchConfig {
    /// Load from the default location, applying the environment override.
    pub fn load() -> Result<Self, RetouchError> {
        let path = default_config_path();
        let mut config = match path {
            Some(ref p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
        .map_err(|e| RetouchError::Config(format!("{:#}", e)))?;

        if let Ok(url) = std::env::var(PROCESSOR_URL_ENV) {
            info!("Processor URL overridden by {}", PROCESSOR_URL_ENV);
            config.processor_url = url;
        }
        config
            .validate()
            .map_err(|e| RetouchError::Config(format!("{:#}", e)))?;
        Ok(config)
    }

    /// Parse a TOML file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Failed to parse config {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.processor_url)
            .with_context(|| format!("Invalid processor URL '{}'", self.processor_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Processor URL must use http or https, got '{}'", url.scheme());
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.settle_timeout_secs == 0 {
            bail!("settle_timeout_secs must be greater than zero");
        }
        if self.clahe_tile_grid_size == 0 {
            bail!("clahe_tile_grid_size must be greater than zero");
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    pub fn clahe(&self) -> OneShot {
        OneShot::Clahe {
            clip_limit: self.clahe_clip_limit,
            tile_grid_size: self.clahe_tile_grid_size,
        }
    }

    pub fn s_curve(&self) -> OneShot {
        OneShot::SCurve {
            intensity: self.s_curve_intensity,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("retouch").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RetouchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.clahe(),
            OneShot::Clahe {
                clip_limit: 2.0,
                tile_grid_size: 8
            }
        );
        assert_eq!(config.s_curve(), OneShot::SCurve { intensity: 0.5 });
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RetouchConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RetouchConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "processor_url = \"https://img.example.com\"\n").unwrap();

        let config = RetouchConfig::from_file(&path).unwrap();
        assert_eq!(config.processor_url, "https://img.example.com");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_full_file_overrides_every_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = RetouchConfig {
            settle_timeout_secs: 5,
            s_curve_intensity: 0.8,
            ..RetouchConfig::default()
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(RetouchConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "processor_url = [").unwrap();
        let err = RetouchConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let ftp = RetouchConfig {
            processor_url: "ftp://host".to_string(),
            ..RetouchConfig::default()
        };
        assert!(ftp.validate().is_err());

        let zero = RetouchConfig {
            settle_timeout_secs: 0,
            ..RetouchConfig::default()
        };
        assert!(zero.validate().is_err());
    }
}
