//! Shared fixtures for integration tests.

#![allow(dead_code)]

use capture_fx::capture::SyntheticProvider;
use capture_fx::dialog::{
    ActionBinding, CaptureView, DialogConfig, DialogHandle, ModalPresenter, Notice, NoticeLevel,
};
use capture_fx::{CaptureOptions, CaptureSession, ImageDataUri};
use std::cell::RefCell;
use std::rc::Rc;

/// Everything the session asked the UI to do.
#[derive(Debug, Default)]
pub struct UiLog {
    pub presented: Vec<DialogConfig>,
    pub notices: Vec<Notice>,
    pub primary: Option<ActionBinding>,
    pub secondary: Option<ActionBinding>,
    pub custom: Vec<ActionBinding>,
    pub view: Option<CaptureView>,
    pub hides: usize,
    pub open: bool,
}

impl UiLog {
    pub fn alerts(&self) -> usize {
        self.notices
            .iter()
            .filter(|notice| notice.level == NoticeLevel::Error)
            .count()
    }

    pub fn infos(&self) -> usize {
        self.notices
            .iter()
            .filter(|notice| notice.level == NoticeLevel::Info)
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub log: Rc<RefCell<UiLog>>,
}

impl ModalPresenter for RecordingPresenter {
    fn present(&mut self, config: &DialogConfig) -> Box<dyn DialogHandle> {
        let mut log = self.log.borrow_mut();
        log.presented.push(config.clone());
        log.open = true;
        log.primary = None;
        log.secondary = None;
        log.custom.clear();
        log.view = None;
        Box::new(RecordingDialog {
            log: Rc::clone(&self.log),
        })
    }

    fn notify(&mut self, notice: Notice) {
        self.log.borrow_mut().notices.push(notice);
    }
}

struct RecordingDialog {
    log: Rc<RefCell<UiLog>>,
}

impl DialogHandle for RecordingDialog {
    fn set_primary_action(&mut self, binding: ActionBinding) {
        self.log.borrow_mut().primary = Some(binding);
    }

    fn set_secondary_action(&mut self, binding: Option<ActionBinding>) {
        self.log.borrow_mut().secondary = binding;
    }

    fn add_custom_action(&mut self, binding: ActionBinding) {
        let mut log = self.log.borrow_mut();
        log.custom.retain(|existing| existing.tag != binding.tag);
        log.custom.push(binding);
    }

    fn remove_custom_action(&mut self, tag: &str) {
        self.log
            .borrow_mut()
            .custom
            .retain(|existing| existing.tag.as_deref() != Some(tag));
    }

    fn show_view(&mut self, view: CaptureView) {
        self.log.borrow_mut().view = Some(view);
    }

    fn hide(&mut self) {
        let mut log = self.log.borrow_mut();
        log.hides += 1;
        log.open = false;
    }
}

pub type TestSession = CaptureSession<SyntheticProvider, RecordingPresenter>;

pub struct Harness {
    pub session: TestSession,
    pub provider: SyntheticProvider,
    pub ui: Rc<RefCell<UiLog>>,
    pub submissions: Rc<RefCell<Vec<Vec<ImageDataUri>>>>,
}

pub fn harness(provider: SyntheticProvider, options: CaptureOptions) -> Harness {
    let presenter = RecordingPresenter::default();
    let ui = Rc::clone(&presenter.log);
    let submissions: Rc<RefCell<Vec<Vec<ImageDataUri>>>> = Rc::default();

    let mut session = CaptureSession::new(provider.clone(), presenter, options);
    let sink = Rc::clone(&submissions);
    session.on_submit(move |images| sink.borrow_mut().push(images));

    Harness {
        session,
        provider,
        ui,
        submissions,
    }
}

pub fn alerting() -> CaptureOptions {
    CaptureOptions {
        error: true,
        ..CaptureOptions::default()
    }
}
