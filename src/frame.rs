//! Still-frame capture and image data URIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{
    imageops, DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageFormat,
    RgbaImage,
};
use std::fmt;

use crate::capture::MediaStream;
use crate::error::CaptureError;

const PNG_PREFIX: &str = "data:image/png;base64,";

/// A self-contained encoded image, `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDataUri(String);

impl ImageDataUri {
    /// Wrap raw PNG bytes.
    pub fn from_png(bytes: &[u8]) -> Self {
        Self(format!("{PNG_PREFIX}{}", STANDARD.encode(bytes)))
    }

    /// Validate and wrap an existing data URI string.
    pub fn parse(uri: impl Into<String>) -> Result<Self, CaptureError> {
        let uri = uri.into();
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| CaptureError::DataUri("missing 'data:' scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CaptureError::DataUri("missing ',' separator".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(CaptureError::DataUri("payload is not base64".to_string()));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| CaptureError::DataUri(e.to_string()))?;
        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or_default()
    }

    /// Decoded image bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CaptureError> {
        let payload = self
            .0
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| CaptureError::DataUri("missing ',' separator".to_string()))?;
        STANDARD
            .decode(payload)
            .map_err(|e| CaptureError::DataUri(e.to_string()))
    }

    /// Pixel dimensions of the encoded image.
    pub fn dimensions(&self) -> Result<(u32, u32), CaptureError> {
        let bytes = self.to_bytes()?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        Ok(image.dimensions())
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Grab the stream's current frame and encode it as a PNG data URI.
///
/// The frame is drawn onto an off-screen surface sized to the frame itself,
/// never scaled or cropped. A frame whose size differs from the stream's
/// reported size is still kept whole.
pub fn capture_frame(stream: &mut dyn MediaStream) -> Result<ImageDataUri, CaptureError> {
    if !stream.is_live() {
        return Err(CaptureError::NoStream);
    }

    let frame = stream.current_frame()?;
    let (width, height) = frame.dimensions();
    let _span = tracing::debug_span!("capture_frame", width, height).entered();

    let (reported_width, reported_height) = stream.video_size();
    if (width, height) != (reported_width, reported_height) {
        tracing::warn!(
            "Stream reports {}x{} but delivered a {}x{} frame, keeping the frame size",
            reported_width,
            reported_height,
            width,
            height
        );
    }

    let mut surface = RgbaImage::new(width, height);
    let frame = DynamicImage::ImageRgb8(frame).to_rgba8();
    imageops::replace(&mut surface, &frame, 0, 0);

    encode_png(&surface)
}

fn encode_png(surface: &RgbaImage) -> Result<ImageDataUri, CaptureError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        surface.as_raw(),
        surface.width(),
        surface.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(ImageDataUri::from_png(&bytes))
}
