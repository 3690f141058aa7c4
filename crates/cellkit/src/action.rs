#![forbid(unsafe_code)]

//! Deferred cursor-placement actions.
//!
//! Completion items and structural edits return a [`CellAction`] instead of
//! moving focus themselves, so the caller decides when the caret lands.

use std::fmt;

use crate::cell::Cell;
use crate::composites;
use crate::text::TextCell;

/// A one-shot action, usually "focus this cell and put the caret there".
#[must_use = "a CellAction does nothing until executed"]
pub struct CellAction {
    run: Option<Box<dyn FnOnce()>>,
}

impl CellAction {
    pub fn new(run: impl FnOnce() + 'static) -> Self {
        Self {
            run: Some(Box::new(run)),
        }
    }

    /// An action that does nothing.
    pub fn empty() -> Self {
        Self { run: None }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.run.is_none()
    }

    pub fn execute(self) {
        if let Some(run) = self.run {
            run();
        }
    }

    /// Run `self`, then `next`.
    pub fn then(self, next: CellAction) -> Self {
        match (self.is_empty(), next.is_empty()) {
            (true, _) => next,
            (_, true) => self,
            _ => Self::new(move || {
                self.execute();
                next.execute();
            }),
        }
    }
}

impl Default for CellAction {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CellAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellAction")
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// Run the actions in order.
pub fn seq(actions: impl IntoIterator<Item = CellAction>) -> CellAction {
    actions
        .into_iter()
        .fold(CellAction::empty(), CellAction::then)
}

/// Focus the text cell with the caret at the start.
pub fn to_home(cell: &TextCell) -> CellAction {
    to_position(cell, 0)
}

/// Focus the text cell with the caret after the last grapheme.
pub fn to_end(cell: &TextCell) -> CellAction {
    let cell = cell.clone();
    CellAction::new(move || {
        cell.focus();
        let _ = cell.set_caret(cell.len());
    })
}

pub fn to_position(cell: &TextCell, caret: usize) -> CellAction {
    let cell = cell.clone();
    CellAction::new(move || {
        cell.focus();
        let _ = cell.set_caret(caret.min(cell.len()));
    })
}

/// Focus the deepest first focusable cell inside `cell`; text cells get the
/// caret at home.
pub fn to_first_focusable(cell: &Cell) -> CellAction {
    let cell = cell.clone();
    CellAction::new(move || {
        let Some(target) = composites::first_focusable(&cell) else {
            return;
        };
        match TextCell::from_cell(&target) {
            Some(text) => to_home(&text).execute(),
            None => target.focus(),
        }
    })
}

/// Focus the deepest last focusable cell inside `cell`; text cells get the
/// caret at the end.
pub fn to_last_focusable(cell: &Cell) -> CellAction {
    let cell = cell.clone();
    CellAction::new(move || {
        let Some(target) = composites::last_focusable(&cell) else {
            return;
        };
        match TextCell::from_cell(&target) {
            Some(text) => to_end(&text).execute(),
            None => target.focus(),
        }
    })
}

pub fn scroll_to(cell: &Cell) -> CellAction {
    let cell = cell.clone();
    CellAction::new(move || cell.scroll_to())
}
