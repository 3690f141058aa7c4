#![forbid(unsafe_code)]

//! Token-position editing and completion.
//!
//! A [`TokenEditor`] prints a flat list of [`Token`]s as one text cell per
//! token, or as a single placeholder cell while the list is empty. The
//! application describes which tokens exist through a
//! [`TokenCompletionSpec`]; [`TokenCompletion`] turns that description into
//! completion suppliers for the placeholder, for replacing a token in place
//! and for inserting tokens beside one (side transforms).
//!
//! Every commit follows the same steps: edit the token list, reprint the
//! cells, then return a [`crate::action::CellAction`] that places the caret
//! in the new cells.

mod completion;
mod editor;

use std::fmt;
use std::rc::Rc;

use crate::action::CellAction;
use crate::cell::Cell;
use crate::completion::CompletionSupplier;

pub use completion::TokenCompletion;
pub use editor::TokenEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    Operator,
    /// Text that no completion item recognises.
    Error,
}

/// One lexical unit of a token editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Number, text)
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Operator, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Error, text)
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Where the caret lands in a freshly created token cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPosition {
    First,
    Last,
}

/// Turns a completed token into a caret action.
pub type TokenHandler = Rc<dyn Fn(Token) -> CellAction>;

/// Inserts completed tokens at a position of the token list.
#[derive(Clone)]
pub struct Completer {
    complete: Rc<dyn Fn(usize, Vec<Token>) -> CellAction>,
}

impl Completer {
    pub fn new(complete: impl Fn(usize, Vec<Token>) -> CellAction + 'static) -> Self {
        Self {
            complete: Rc::new(complete),
        }
    }

    /// Insert `tokens`, placing the caret in the first of them.
    pub fn complete(&self, tokens: Vec<Token>) -> CellAction {
        self.complete_selecting(0, tokens)
    }

    /// Insert `tokens`, placing the caret in `tokens[selection_index]`.
    pub fn complete_selecting(&self, selection_index: usize, tokens: Vec<Token>) -> CellAction {
        (self.complete)(selection_index, tokens)
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

/// What surrounds the position being completed.
#[derive(Debug, Clone, Default)]
pub struct CompletionContext {
    /// Index the completed tokens go to.
    pub target_index: usize,
    /// Tokens before the target index.
    pub prefix: Vec<Token>,
    /// Cells printing `prefix`.
    pub views: Vec<Cell>,
    /// The whole token list.
    pub tokens: Vec<Token>,
}

/// Application knowledge about which tokens can be typed.
pub trait TokenCompletionSpec {
    /// Items that each produce one token through `handler`.
    fn token_completion(&self, handler: TokenHandler) -> CompletionSupplier;

    /// Menu-only items that may insert several tokens at once.
    fn additional_completion(
        &self,
        _context: &CompletionContext,
        _completer: Completer,
    ) -> CompletionSupplier {
        CompletionSupplier::empty()
    }
}
