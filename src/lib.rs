//! Camera capture dialog: acquire a camera stream, preview it, capture stills
//! and deliver them as PNG data URIs.

pub mod activity;
pub mod capture;
pub mod config;
pub mod dialog;
pub mod error;
pub mod frame;
pub mod session;

pub use capture::{FacingMode, MediaDeviceProvider, MediaStream, StreamConstraints};
pub use dialog::{DialogHandle, ModalPresenter};
pub use error::{CaptureError, MediaAccessError};
pub use frame::ImageDataUri;
pub use session::{CaptureOptions, CaptureSession, SessionAction, SessionState};
