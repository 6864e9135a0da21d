use super::{FacingMode, MediaDeviceProvider, MediaStream, StreamConstraints};
use crate::error::{CaptureError, MediaAccessError};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Scripted result of one stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Grant,
    /// Grant once the delay has elapsed on the tokio clock
    GrantAfter(Duration),
    Deny,
    Unavailable,
}

#[derive(Debug, Default)]
struct Ledger {
    script: VecDeque<StreamOutcome>,
    requests: Vec<StreamConstraints>,
    live: usize,
    peak_live: usize,
    opened: usize,
    frames: u64,
}

/// Deterministic in-memory camera provider.
///
/// Outcomes are consumed from a script in request order; once the script is
/// exhausted every request is granted. Clones share the same ledger, so a test
/// can keep one handle while the session owns another.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    ledger: Rc<RefCell<Ledger>>,
    environment_size: (u32, u32),
    user_size: (u32, u32),
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger::default())),
            environment_size: (64, 48),
            user_size: (32, 24),
        }
    }

    pub fn with_script(outcomes: impl IntoIterator<Item = StreamOutcome>) -> Self {
        let provider = Self::new();
        provider.ledger.borrow_mut().script.extend(outcomes);
        provider
    }

    /// Override the native frame size reported for a facing mode.
    pub fn with_size(mut self, facing_mode: FacingMode, width: u32, height: u32) -> Self {
        match facing_mode {
            FacingMode::Environment => self.environment_size = (width, height),
            FacingMode::User => self.user_size = (width, height),
        }
        self
    }

    pub fn push_outcome(&self, outcome: StreamOutcome) {
        self.ledger.borrow_mut().script.push_back(outcome);
    }

    /// Streams currently holding the (pretend) hardware.
    pub fn live_streams(&self) -> usize {
        self.ledger.borrow().live
    }

    /// Highest number of simultaneously live streams seen so far.
    pub fn peak_live_streams(&self) -> usize {
        self.ledger.borrow().peak_live
    }

    pub fn streams_opened(&self) -> usize {
        self.ledger.borrow().opened
    }

    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.ledger.borrow().requests.clone()
    }

    fn open(&self, facing_mode: FacingMode) -> SyntheticStream {
        let mut ledger = self.ledger.borrow_mut();
        ledger.live += 1;
        ledger.opened += 1;
        ledger.peak_live = ledger.peak_live.max(ledger.live);

        let (width, height) = match facing_mode {
            FacingMode::Environment => self.environment_size,
            FacingMode::User => self.user_size,
        };

        SyntheticStream {
            ledger: Rc::clone(&self.ledger),
            facing_mode,
            width,
            height,
            live: true,
        }
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl MediaDeviceProvider for SyntheticProvider {
    async fn request_stream(
        &mut self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError> {
        let outcome = {
            let mut ledger = self.ledger.borrow_mut();
            ledger.requests.push(constraints);
            ledger.script.pop_front().unwrap_or(StreamOutcome::Grant)
        };

        let facing_mode = constraints.video.facing_mode;
        match outcome {
            StreamOutcome::Grant => Ok(Box::new(self.open(facing_mode))),
            StreamOutcome::GrantAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Box::new(self.open(facing_mode)))
            }
            StreamOutcome::Deny => Err(MediaAccessError::PermissionDenied),
            StreamOutcome::Unavailable => Err(MediaAccessError::NotFound(facing_mode)),
        }
    }
}

#[derive(Debug)]
struct SyntheticStream {
    ledger: Rc<RefCell<Ledger>>,
    facing_mode: FacingMode,
    width: u32,
    height: u32,
    live: bool,
}

impl MediaStream for SyntheticStream {
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.live {
            return Err(CaptureError::NoStream);
        }

        let sequence = {
            let mut ledger = self.ledger.borrow_mut();
            ledger.frames += 1;
            ledger.frames
        };

        // Gradient keyed on the sequence number so consecutive frames differ.
        let tint = match self.facing_mode {
            FacingMode::Environment => 0u8,
            FacingMode::User => 128u8,
        };
        let shift = (sequence % 256) as u8;
        Ok(RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                (x % 256) as u8 ^ shift,
                (y % 256) as u8,
                tint.wrapping_add(shift),
            ])
        }))
    }

    fn video_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.ledger.borrow_mut().live -= 1;
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop();
    }
}
