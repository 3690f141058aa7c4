#![forbid(unsafe_code)]

//! Text cells.
//!
//! A [`TextCell`] is a [`Cell`] of kind [`CellKind::Text`] with a text and a
//! caret. The caret is a grapheme-cluster index, so it never splits a
//! user-perceived character.

pub mod editing;

use std::fmt;
use std::ops::Deref;

use cellkit_core::{Color, Registration};
use unicode_segmentation::UnicodeSegmentation;

use crate::cell::{Cell, CellKind};
use crate::property::CellPropertySpec;

pub static TEXT: CellPropertySpec<String> = CellPropertySpec::new("text", |_| String::new());
/// Grapheme index of the caret.
pub static CARET_POSITION: CellPropertySpec<usize> = CellPropertySpec::new("caretPosition", |_| 0);
pub static CARET_VISIBLE: CellPropertySpec<bool> = CellPropertySpec::new("caretVisible", |_| false);
pub static TEXT_COLOR: CellPropertySpec<Option<Color>> =
    CellPropertySpec::new("textColor", |_| None);

/// Typed handle to a text cell. Dereferences to the underlying [`Cell`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TextCell {
    cell: Cell,
}

impl TextCell {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Cell::new(CellKind::Text),
        }
    }

    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        let cell = Self::new();
        let _ = cell.set_text(text);
        cell
    }

    /// View `cell` as a text cell if it has the text kind.
    #[must_use]
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        (cell.kind() == CellKind::Text).then(|| Self { cell: cell.clone() })
    }

    #[must_use]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.cell.get(&TEXT)
    }

    pub fn set_text(&self, text: impl Into<String>) -> Registration {
        self.cell.set(&TEXT, text.into())
    }

    #[must_use]
    pub fn caret(&self) -> usize {
        self.cell.get(&CARET_POSITION)
    }

    pub fn set_caret(&self, caret: usize) -> Registration {
        self.cell.set(&CARET_POSITION, caret)
    }

    /// Length in grapheme clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text().graphemes(true).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Text before the caret.
    #[must_use]
    pub fn prefix_text(&self) -> String {
        let text = self.text();
        let end = byte_offset(&text, self.caret());
        text[..end].to_string()
    }

    #[must_use]
    pub fn is_home(&self) -> bool {
        self.caret() == 0
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.caret() >= self.len()
    }
}

impl Default for TextCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TextCell {
    type Target = Cell;

    fn deref(&self) -> &Cell {
        &self.cell
    }
}

impl From<TextCell> for Cell {
    fn from(text: TextCell) -> Cell {
        text.cell
    }
}

impl fmt::Debug for TextCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextCell")
            .field("text", &self.text())
            .field("caret", &self.caret())
            .finish()
    }
}

/// Byte offset of grapheme index `index`, clamped to the text length.
pub(crate) fn byte_offset(text: &str, index: usize) -> usize {
    text.grapheme_indices(true)
        .nth(index)
        .map_or(text.len(), |(offset, _)| offset)
}
