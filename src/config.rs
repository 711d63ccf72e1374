// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{config as config_paths, timing};
use crate::errors::{ScanError, ScanResult};
use crate::source::FacingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Which decoder backend a session submits frames to
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// In-process QR decoder, always available
    #[default]
    Rqrr,
    /// Prebuilt native decoder library (requires the `native` feature at build time)
    Native,
}

impl std::fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderKind::Rqrr => write!(f, "rqrr"),
            DecoderKind::Native => write!(f, "native"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Milliseconds between scan ticks
    pub sample_interval_ms: u64,
    /// Camera facing preference (rear camera by default)
    pub facing: FacingMode,
    /// Decoder backend to submit frames to
    pub decoder: DecoderKind,
    /// Explicit capture device path, overriding enumeration
    pub device_path: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: timing::SAMPLE_INTERVAL.as_millis() as u64,
            facing: FacingMode::default(), // Rear camera
            decoder: DecoderKind::default(),
            device_path: None,
        }
    }
}

impl ScannerConfig {
    /// Interval between scan ticks, clamped to the supported minimum
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms).max(timing::MIN_SAMPLE_INTERVAL)
    }

    /// Default config file location under the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(config_paths::APP_DIR)
                .join(config_paths::FILE_NAME)
        })
    }

    /// Load the config from the default location
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is logged and also yields the defaults, so a broken config never
    /// blocks scanning.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from an explicit path
    pub fn load_from(path: &Path) -> ScanResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| ScanError::Config(format!("Invalid config file: {}", e)))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Persist the config to the default location
    pub fn save(&self) -> ScanResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| ScanError::Config("No config directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Persist the config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> ScanResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("scanner-config-{}-{}", name, uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.sample_interval(), Duration::from_millis(250));
        assert_eq!(config.facing, FacingMode::Environment);
        assert_eq!(config.decoder, DecoderKind::Rqrr);
        assert!(config.device_path.is_none());
    }

    #[test]
    fn test_interval_clamped_to_minimum() {
        let config = ScannerConfig {
            sample_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.sample_interval(), timing::MIN_SAMPLE_INTERVAL);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = scratch_path("round-trip");
        let config = ScannerConfig {
            sample_interval_ms: 100,
            facing: FacingMode::User,
            decoder: DecoderKind::Rqrr,
            device_path: Some("/dev/video2".to_string()),
        };
        config.save_to(&path).unwrap();
        let loaded = ScannerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        // Older config files may not carry every field
        let config: ScannerConfig = serde_json::from_str("{\"sample_interval_ms\": 500}").unwrap();
        assert_eq!(config.sample_interval_ms, 500);
        assert_eq!(config.facing, FacingMode::Environment);
        assert_eq!(config.decoder, DecoderKind::Rqrr);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = scratch_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        match ScannerConfig::load_from(&path) {
            Err(ScanError::Config(_)) => {}
            other => panic!("Expected Config error, got {:?}", other),
        }
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
