#![forbid(unsafe_code)]

//! Caret position of the focused cell relative to an enclosing cell.

use crate::cell::Cell;
use crate::composites;
use crate::text::TextCell;

fn focused_inside(cell: &Cell) -> Option<Cell> {
    let focused = cell.container()?.focused_cell()?;
    cell.is_ancestor_of(&focused).then_some(focused)
}

/// The focused cell is the first focusable cell of `cell` and, for text,
/// its caret is at the start. False when focus is elsewhere.
#[must_use]
pub fn is_home_position(cell: &Cell) -> bool {
    let Some(focused) = focused_inside(cell) else {
        return false;
    };
    if composites::first_focusable(cell).as_ref() != Some(&focused) {
        return false;
    }
    TextCell::from_cell(&focused).is_none_or(|text| text.is_home())
}

/// The focused cell is the last focusable cell of `cell` and, for text,
/// its caret is after the last grapheme.
#[must_use]
pub fn is_end_position(cell: &Cell) -> bool {
    let Some(focused) = focused_inside(cell) else {
        return false;
    };
    if composites::last_focusable(cell).as_ref() != Some(&focused) {
        return false;
    }
    TextCell::from_cell(&focused).is_none_or(|text| text.is_end())
}
