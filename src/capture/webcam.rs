use super::{FacingMode, MediaDeviceProvider, MediaStream, StreamConstraints};
use crate::error::{CaptureError, MediaAccessError};
use async_trait::async_trait;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{query, Camera};
use std::fmt;

/// Device indices backing each facing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraMap {
    pub environment: u32,
    pub user: u32,
}

impl CameraMap {
    pub fn device_for(&self, facing_mode: FacingMode) -> u32 {
        match facing_mode {
            FacingMode::Environment => self.environment,
            FacingMode::User => self.user,
        }
    }
}

impl Default for CameraMap {
    fn default() -> Self {
        Self {
            environment: 0,
            user: 1,
        }
    }
}

/// Information about an attached camera.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Enumerate cameras known to the platform backend.
pub fn list_cameras() -> Result<Vec<CameraInfo>, MediaAccessError> {
    let devices = query(ApiBackend::Auto).map_err(|e| MediaAccessError::Unavailable {
        device: "*".to_string(),
        reason: e.to_string(),
    })?;

    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Provider backed by locally attached webcams.
///
/// nokhwa opens devices with a blocking call. The request yields to the event
/// loop once before opening, so a cancellation issued by then still wins; after
/// that the open runs to completion and cannot be interrupted.
pub struct WebcamProvider {
    cameras: CameraMap,
}

impl WebcamProvider {
    pub fn new(cameras: CameraMap) -> Self {
        Self { cameras }
    }

    fn open(&self, facing_mode: FacingMode) -> Result<WebcamStream, MediaAccessError> {
        let device_index = self.cameras.device_for(facing_mode);
        tracing::info!("Opening webcam {} for facing mode {}", device_index, facing_mode);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let unavailable = |reason: String| MediaAccessError::Unavailable {
            device: format!("video{device_index}"),
            reason,
        };

        let mut camera = Camera::new(index, requested).map_err(|e| unavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| unavailable(e.to_string()))?;

        let res = camera.resolution();
        tracing::info!(
            "Webcam {} streaming at {}x{}",
            device_index,
            res.width(),
            res.height()
        );

        Ok(WebcamStream {
            camera,
            width: res.width(),
            height: res.height(),
            live: true,
        })
    }
}

#[async_trait(?Send)]
impl MediaDeviceProvider for WebcamProvider {
    async fn request_stream(
        &mut self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError> {
        tokio::task::yield_now().await;
        let stream = self.open(constraints.video.facing_mode)?;
        Ok(Box::new(stream))
    }
}

struct WebcamStream {
    camera: Camera,
    width: u32,
    height: u32,
    live: bool,
}

impl MediaStream for WebcamStream {
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.live {
            return Err(CaptureError::NoStream);
        }

        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Frame(e.to_string()))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Frame(e.to_string()))
    }

    fn video_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop webcam stream cleanly: {}", e);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        self.stop();
    }
}
