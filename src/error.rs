use std::path::PathBuf;
use thiserror::Error;

use crate::capture::FacingMode;
use crate::session::{SessionAction, SessionState};

/// Failure to obtain a camera stream: permission denial or missing hardware.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAccessError {
    #[error("permission to use the camera was denied")]
    PermissionDenied,

    #[error("no camera available for facing mode {0}")]
    NotFound(FacingMode),

    #[error("camera {device} could not be opened: {reason}")]
    Unavailable { device: String, reason: String },
}

/// Errors raised by a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),

    #[error("stream request was cancelled")]
    Cancelled,

    #[error("{action} is not available while the session is {state}")]
    InvalidTransition {
        action: SessionAction,
        state: SessionState,
    },

    #[error("no active camera stream")]
    NoStream,

    #[error("failed to read frame: {0}")]
    Frame(String),

    #[error("failed to encode frame")]
    Encode(#[from] image::ImageError),

    #[error("malformed image data URI: {0}")]
    DataUri(String),
}

impl CaptureError {
    /// True when the failure came from the device provider.
    pub fn is_media_access(&self) -> bool {
        matches!(self, CaptureError::MediaAccess(_))
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
