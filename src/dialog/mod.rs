mod console;

pub use console::ConsolePresenter;

use crate::frame::ImageDataUri;
use crate::session::SessionAction;

/// Settings for a presented dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogConfig {
    pub title: String,
    pub animate: bool,
}

/// A button on the dialog and the session action it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBinding {
    pub label: String,
    pub action: SessionAction,
    /// Identifies custom actions so they can be removed again
    pub tag: Option<String>,
}

impl ActionBinding {
    pub fn new(label: impl Into<String>, action: SessionAction) -> Self {
        Self {
            label: label.into(),
            action,
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// What the dialog body currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureView {
    /// The live camera feed
    Live,
    /// A captured still in place of the feed
    Preview(ImageDataUri),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Transient informational notice
    Info,
    /// User-visible alert for a failure
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Handle to one presented dialog.
///
/// Button presses are not delivered through closures: the UI hands the bound
/// [`SessionAction`] back to `CaptureSession::dispatch`.
pub trait DialogHandle {
    fn set_primary_action(&mut self, binding: ActionBinding);

    fn set_secondary_action(&mut self, binding: Option<ActionBinding>);

    /// Add an extra button identified by its tag
    fn add_custom_action(&mut self, binding: ActionBinding);

    /// Remove a previously added custom button; unknown tags are ignored
    fn remove_custom_action(&mut self, tag: &str);

    fn show_view(&mut self, view: CaptureView);

    /// Dismiss the dialog. Safe to call more than once.
    fn hide(&mut self);
}

/// Dialog and notification surface.
pub trait ModalPresenter {
    fn present(&mut self, config: &DialogConfig) -> Box<dyn DialogHandle>;

    fn notify(&mut self, notice: Notice);
}
