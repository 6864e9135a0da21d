use super::{
    ActionBinding, CaptureView, DialogConfig, DialogHandle, ModalPresenter, Notice, NoticeLevel,
};
use crate::session::SessionAction;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Board {
    title: String,
    visible: bool,
    primary: Option<ActionBinding>,
    secondary: Option<ActionBinding>,
    custom: Vec<ActionBinding>,
    view: Option<CaptureView>,
}

impl Board {
    fn buttons(&self) -> Vec<&ActionBinding> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .chain(self.custom.iter())
            .collect()
    }
}

/// Text-mode presenter: prints the dialog and maps typed input to actions.
///
/// Clones share one board, so the caller can keep a handle for
/// [`ConsolePresenter::resolve`] after moving another into the session.
#[derive(Debug, Clone, Default)]
pub struct ConsolePresenter {
    board: Rc<RefCell<Board>>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.board.borrow().visible
    }

    /// Print the dialog with numbered buttons.
    pub fn render(&self) {
        let board = self.board.borrow();
        if !board.visible {
            return;
        }

        println!();
        println!("== {} ==", board.title);
        match &board.view {
            Some(CaptureView::Live) => println!("  [live camera feed]"),
            Some(CaptureView::Preview(uri)) => {
                let size = uri
                    .dimensions()
                    .map(|(w, h)| format!("{w}x{h}"))
                    .unwrap_or_else(|_| "?".to_string());
                println!("  [captured frame {size}]");
            }
            None => println!("  [waiting for camera]"),
        }
        for (n, button) in board.buttons().iter().enumerate() {
            println!("  {}) {}", n + 1, button.label);
        }
        println!("  q) Close");
    }

    /// Match a typed button number or label against the visible buttons.
    pub fn resolve(&self, input: &str) -> Option<SessionAction> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("close") {
            return Some(SessionAction::Hide);
        }

        let board = self.board.borrow();
        let buttons = board.buttons();
        if let Ok(n) = input.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| buttons.get(i))
                .map(|button| button.action);
        }
        buttons
            .iter()
            .find(|button| button.label.eq_ignore_ascii_case(input))
            .map(|button| button.action)
    }
}

impl ModalPresenter for ConsolePresenter {
    fn present(&mut self, config: &DialogConfig) -> Box<dyn DialogHandle> {
        {
            let mut board = self.board.borrow_mut();
            *board = Board {
                title: config.title.clone(),
                visible: true,
                ..Board::default()
            };
        }
        tracing::debug!("Presenting dialog '{}' (animate={})", config.title, config.animate);
        Box::new(ConsoleDialog {
            board: Rc::clone(&self.board),
        })
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => println!("(i) {}", notice.message),
            NoticeLevel::Error => println!("(!) {}", notice.message),
        }
    }
}

struct ConsoleDialog {
    board: Rc<RefCell<Board>>,
}

impl DialogHandle for ConsoleDialog {
    fn set_primary_action(&mut self, binding: ActionBinding) {
        self.board.borrow_mut().primary = Some(binding);
    }

    fn set_secondary_action(&mut self, binding: Option<ActionBinding>) {
        self.board.borrow_mut().secondary = binding;
    }

    fn add_custom_action(&mut self, binding: ActionBinding) {
        let mut board = self.board.borrow_mut();
        if let Some(tag) = &binding.tag {
            board.custom.retain(|existing| existing.tag.as_ref() != Some(tag));
        }
        board.custom.push(binding);
    }

    fn remove_custom_action(&mut self, tag: &str) {
        self.board
            .borrow_mut()
            .custom
            .retain(|existing| existing.tag.as_deref() != Some(tag));
    }

    fn show_view(&mut self, view: CaptureView) {
        self.board.borrow_mut().view = Some(view);
    }

    fn hide(&mut self) {
        self.board.borrow_mut().visible = false;
    }
}
