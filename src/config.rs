//! Configuration file handling.
//!
//! Loads from `<config dir>/capture-fx/config.toml` or a path given with `--config`.
//! Every field is optional; command-line flags override what the file sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{CameraMap, FacingMode};
use crate::error::ConfigError;
use crate::session::CaptureOptions;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dialog: DialogSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize)]
pub struct DialogSection {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub animate: bool,
    #[serde(default = "default_true")]
    pub error: bool,
}

impl Default for DialogSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            animate: false,
            error: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CameraSection {
    #[serde(default)]
    pub environment_device: u32,
    #[serde(default = "default_user_device")]
    pub user_device: u32,
    #[serde(default)]
    pub facing_mode: FacingMode,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            environment_device: 0,
            user_device: default_user_device(),
            facing_mode: FacingMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionSection {
    /// Hide the dialog after this many seconds without input; unset disables it
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputSection {
    pub directory: Option<PathBuf>,
}

fn default_title() -> String {
    "Camera".to_string()
}

fn default_true() -> bool {
    true
}

fn default_user_device() -> u32 {
    1
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            title: self.dialog.title.clone(),
            animate: self.dialog.animate,
            error: self.dialog.error,
        }
    }

    pub fn camera_map(&self) -> CameraMap {
        CameraMap {
            environment: self.camera.environment_device,
            user: self.camera.user_device,
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.session
            .idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("capture-fx")
        .join("config.toml")
}
