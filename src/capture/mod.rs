mod synthetic;
mod webcam;

pub use synthetic::{StreamOutcome, SyntheticProvider};
pub use webcam::{list_cameras, CameraInfo, CameraMap, WebcamProvider};

use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use std::fmt;

use crate::error::{CaptureError, MediaAccessError};

/// Which physical camera a stream is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl FacingMode {
    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "environment" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(format!("unknown facing mode '{other}'")),
        }
    }
}

/// Video track constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
}

/// Constraints handed to a [`MediaDeviceProvider`], shaped as `{video: {facingMode}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub video: VideoConstraints,
}

impl StreamConstraints {
    pub fn facing(facing_mode: FacingMode) -> Self {
        Self {
            video: VideoConstraints { facing_mode },
        }
    }
}

/// A live camera feed.
///
/// Implementations must release the underlying hardware in [`MediaStream::stop`]
/// and tolerate being stopped more than once.
pub trait MediaStream {
    /// Grab the frame currently on the feed
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Native (width, height) of the video
    fn video_size(&self) -> (u32, u32);

    /// Stop every track of the stream
    fn stop(&mut self);

    /// Whether any track is still running
    fn is_live(&self) -> bool;
}

/// Source of camera streams.
///
/// Requests are gated by user permission and hardware availability, so they
/// are asynchronous and may fail with a [`MediaAccessError`]. Capture runs on
/// a single UI event loop, hence no `Send` bound.
#[async_trait(?Send)]
pub trait MediaDeviceProvider {
    async fn request_stream(
        &mut self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError>;
}
