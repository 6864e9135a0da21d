//! Photo-capture session: acquires a camera stream, shows a live preview,
//! captures stills and hands them to a registered callback.
//!
//! ```text
//! Idle -> Requesting -> Previewing <-> Captured
//!            |                            |
//!            +-> Error -> Idle            +-> (submit) -> Idle
//! ```
//!
//! Each state owns its dialog bindings (see [`StateBindings::for_state`]);
//! entering a state applies them to the dialog in one place.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::capture::{FacingMode, MediaDeviceProvider, MediaStream, StreamConstraints};
use crate::dialog::{
    ActionBinding, CaptureView, DialogConfig, DialogHandle, ModalPresenter, Notice,
};
use crate::error::CaptureError;
use crate::frame::{self, ImageDataUri};

const TAKE_MULTIPLE_TAG: &str = "take-multiple";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream held, no dialog shown
    Idle,
    /// Waiting on the device provider
    Requesting,
    /// Live feed shown
    Previewing,
    /// Last capture shown in place of the feed
    Captured,
    /// Stream request failed; torn down back to `Idle` before `show` returns
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Requesting => "requesting",
            SessionState::Previewing => "previewing",
            SessionState::Captured => "captured",
            SessionState::Error => "in error",
        };
        f.write_str(name)
    }
}

/// Everything a user (or dialog button) can ask the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Show,
    TakePhoto,
    Retake,
    Submit,
    TakeMultiple,
    SwitchCamera,
    Hide,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionAction::Show => "show",
            SessionAction::TakePhoto => "take photo",
            SessionAction::Retake => "retake",
            SessionAction::Submit => "submit",
            SessionAction::TakeMultiple => "take multiple",
            SessionAction::SwitchCamera => "switch camera",
            SessionAction::Hide => "hide",
        };
        f.write_str(name)
    }
}

/// Dialog buttons for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBindings {
    pub primary: Option<ActionBinding>,
    pub secondary: Option<ActionBinding>,
    pub custom: Option<ActionBinding>,
}

impl StateBindings {
    pub fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::Previewing => Self {
                primary: Some(ActionBinding::new("Take Photo", SessionAction::TakePhoto)),
                secondary: Some(ActionBinding::new("Switch Camera", SessionAction::SwitchCamera)),
                custom: None,
            },
            SessionState::Captured => Self {
                primary: Some(ActionBinding::new("Submit", SessionAction::Submit)),
                secondary: Some(ActionBinding::new("Retake", SessionAction::Retake)),
                custom: Some(
                    ActionBinding::new("Take Multiple", SessionAction::TakeMultiple)
                        .tagged(TAKE_MULTIPLE_TAG),
                ),
            },
            SessionState::Idle | SessionState::Requesting | SessionState::Error => Self {
                primary: None,
                secondary: None,
                custom: None,
            },
        }
    }

    fn apply(self, dialog: &mut dyn DialogHandle) {
        if let Some(primary) = self.primary {
            dialog.set_primary_action(primary);
        }
        dialog.set_secondary_action(self.secondary);
        match self.custom {
            Some(custom) => dialog.add_custom_action(custom),
            None => dialog.remove_custom_action(TAKE_MULTIPLE_TAG),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub title: String,
    pub animate: bool,
    /// Surface stream failures as a user-visible alert
    pub error: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            title: "Camera".to_string(),
            animate: false,
            error: false,
        }
    }
}

/// Aborts the stream request currently in flight, if any.
///
/// Cancelling while no request is pending has no effect, the next `show`
/// proceeds normally.
#[derive(Debug, Clone, Default)]
pub struct SessionCanceller {
    notify: Arc<Notify>,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.notify.notify_waiters();
    }
}

pub type SubmitCallback = Box<dyn FnMut(Vec<ImageDataUri>)>;

pub struct CaptureSession<P, M> {
    provider: P,
    presenter: M,
    options: CaptureOptions,
    state: SessionState,
    facing_mode: FacingMode,
    images: Vec<ImageDataUri>,
    stream: Option<Box<dyn MediaStream>>,
    dialog: Option<Box<dyn DialogHandle>>,
    callback: Option<SubmitCallback>,
    canceller: SessionCanceller,
}

impl<P, M> CaptureSession<P, M> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn images(&self) -> &[ImageDataUri] {
        &self.images
    }

    pub fn has_live_stream(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.is_live())
    }

    pub fn canceller(&self) -> SessionCanceller {
        self.canceller.clone()
    }

    /// Register the consumer of submitted images, replacing any previous one.
    pub fn on_submit(&mut self, callback: impl FnMut(Vec<ImageDataUri>) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Release the stream and dismiss the dialog. Valid in every state.
    pub fn hide(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::info!("Camera stream released");
        }
        if let Some(mut dialog) = self.dialog.take() {
            dialog.hide();
        }
        self.state = SessionState::Idle;
    }

    fn expect_state(
        &self,
        action: SessionAction,
        expected: SessionState,
    ) -> Result<(), CaptureError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn enter(&mut self, state: SessionState, view: CaptureView) {
        tracing::debug!("Session {} -> {}", self.state, state);
        self.state = state;
        if let Some(dialog) = self.dialog.as_deref_mut() {
            dialog.show_view(view);
            StateBindings::for_state(state).apply(dialog);
        }
    }
}

impl<P, M> CaptureSession<P, M>
where
    P: MediaDeviceProvider,
    M: ModalPresenter,
{
    pub fn new(provider: P, presenter: M, options: CaptureOptions) -> Self {
        Self {
            provider,
            presenter,
            options,
            state: SessionState::Idle,
            facing_mode: FacingMode::default(),
            images: Vec::new(),
            stream: None,
            dialog: None,
            callback: None,
            canceller: SessionCanceller::default(),
        }
    }

    /// Start with a specific camera instead of the rear one.
    pub fn with_facing_mode(mut self, facing_mode: FacingMode) -> Self {
        self.facing_mode = facing_mode;
        self
    }

    /// Request a stream and present the capture dialog.
    ///
    /// On failure the session is back in `Idle` with `images` and
    /// `facing_mode` untouched; nothing is retried.
    pub async fn show(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionAction::Show, SessionState::Idle)?;
        self.state = SessionState::Requesting;

        let constraints = StreamConstraints::facing(self.facing_mode);
        tracing::info!("Requesting {} camera", self.facing_mode);

        let cancelled = self.canceller.notify.notified();
        let outcome = tokio::select! {
            biased;
            _ = cancelled => None,
            result = self.provider.request_stream(constraints) => Some(result),
        };

        let stream = match outcome {
            None => {
                tracing::info!("Camera request cancelled");
                self.hide();
                return Err(CaptureError::Cancelled);
            }
            Some(Err(e)) => {
                self.state = SessionState::Error;
                tracing::warn!("Camera request failed: {}", e);
                if self.options.error {
                    self.presenter.notify(Notice::error(e.to_string()));
                }
                self.hide();
                return Err(e.into());
            }
            Some(Ok(stream)) => stream,
        };

        let (width, height) = stream.video_size();
        tracing::info!("Camera stream ready at {}x{}", width, height);
        self.stream = Some(stream);
        self.dialog = Some(self.presenter.present(&DialogConfig {
            title: self.options.title.clone(),
            animate: self.options.animate,
        }));
        self.enter(SessionState::Previewing, CaptureView::Live);
        Ok(())
    }

    /// Capture the current frame and show it in place of the live feed.
    pub fn take_photo(&mut self) -> Result<&ImageDataUri, CaptureError> {
        self.expect_state(SessionAction::TakePhoto, SessionState::Previewing)?;
        let stream = self.stream.as_deref_mut().ok_or(CaptureError::NoStream)?;
        let image = frame::capture_frame(stream)?;

        self.images.push(image.clone());
        tracing::info!("Captured image {}", self.images.len());
        self.enter(SessionState::Captured, CaptureView::Preview(image));

        self.images.last().ok_or(CaptureError::NoStream)
    }

    /// Drop the last capture and go back to the live feed.
    pub fn retake(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionAction::Retake, SessionState::Captured)?;
        self.images.pop();
        tracing::debug!("Discarded last capture, {} kept", self.images.len());
        self.enter(SessionState::Previewing, CaptureView::Live);
        Ok(())
    }

    /// Keep the last capture and go back to the live feed for another.
    pub fn take_multiple(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionAction::TakeMultiple, SessionState::Captured)?;
        self.enter(SessionState::Previewing, CaptureView::Live);
        Ok(())
    }

    /// Deliver every capture to the callback and close the session.
    pub fn submit(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionAction::Submit, SessionState::Captured)?;
        match self.callback.as_mut() {
            Some(callback) => {
                tracing::info!("Submitting {} image(s)", self.images.len());
                callback(self.images.clone());
            }
            None => tracing::debug!("Submit with no callback registered"),
        }
        self.hide();
        Ok(())
    }

    /// Re-acquire the stream from the opposite camera.
    ///
    /// The current stream is released before the new one is requested. If the
    /// new request fails the facing mode reverts and the session is `Idle`.
    pub async fn switch_camera(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionAction::SwitchCamera, SessionState::Previewing)?;

        let previous = self.facing_mode;
        self.facing_mode = previous.toggled();
        self.presenter.notify(Notice::info(format!(
            "Switching to {} camera",
            self.facing_mode
        )));

        self.hide();
        if let Err(e) = self.show().await {
            self.facing_mode = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Run the operation bound to a dialog button.
    pub async fn dispatch(&mut self, action: SessionAction) -> Result<(), CaptureError> {
        match action {
            SessionAction::Show => self.show().await,
            SessionAction::TakePhoto => self.take_photo().map(|_| ()),
            SessionAction::Retake => self.retake(),
            SessionAction::Submit => self.submit(),
            SessionAction::TakeMultiple => self.take_multiple(),
            SessionAction::SwitchCamera => self.switch_camera().await,
            SessionAction::Hide => {
                self.hide();
                Ok(())
            }
        }
    }
}

impl<P, M> Drop for CaptureSession<P, M> {
    fn drop(&mut self) {
        self.hide();
    }
}
