#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::action::{self, CellAction};
use crate::cell::{Cell, WeakCell};
use crate::cell_trait::CellTrait;
use crate::completion::{COMPLETION, LEFT_TRANSFORM, RIGHT_TRANSFORM, completion_support};
use crate::property::{Lookup, PropertyChange, PropertyKey};
use crate::text::editing::{AFTER_TYPE, AfterType, text_editing, valid_text_editing};
use crate::text::{TEXT, TextCell};
use crate::token::{
    CompletionContext, SelectionPosition, Token, TokenCompletion, TokenCompletionSpec,
};

/// A horizontal row of token cells over a token list.
///
/// The row shows one editable text cell per token, or a single empty
/// placeholder while the list is empty. Typing into a token cell keeps the
/// list in sync; text a token cannot hold opens a side transform at that
/// boundary.
#[derive(Clone)]
pub struct TokenEditor {
    inner: Rc<EditorInner>,
}

pub(super) struct EditorInner {
    target: Cell,
    tokens: RefCell<Vec<Token>>,
    placeholder: RefCell<Option<TextCell>>,
    pub(super) spec: Rc<dyn TokenCompletionSpec>,
}

impl TokenEditor {
    pub fn new(spec: Rc<dyn TokenCompletionSpec>) -> Self {
        let inner = Rc::new(EditorInner {
            target: Cell::horizontal(),
            tokens: RefCell::new(Vec::new()),
            placeholder: RefCell::new(None),
            spec,
        });
        inner.update();
        Self { inner }
    }

    /// The row cell; attach it wherever the tokens should appear.
    #[must_use]
    pub fn cell(&self) -> Cell {
        self.inner.target.clone()
    }

    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        self.inner.tokens.borrow().clone()
    }

    /// Replace the token list and reprint.
    pub fn set_tokens(&self, tokens: Vec<Token>) {
        *self.inner.tokens.borrow_mut() = tokens;
        self.inner.update();
    }

    /// Cells printing the tokens, in order. Empty while the placeholder
    /// is shown.
    #[must_use]
    pub fn token_cells(&self) -> Vec<TextCell> {
        self.inner.token_cells()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<TextCell> {
        self.inner.placeholder.borrow().clone()
    }

    /// Rebuild the cells from the token list.
    pub fn update_to_printed_tokens(&self) {
        self.inner.update();
    }

    #[must_use]
    pub fn completion(&self) -> TokenCompletion {
        TokenCompletion::new(Rc::downgrade(&self.inner))
    }

    /// Caret action for the token cell at `index`, resolved when executed.
    pub fn select_on_creation(&self, index: usize, position: SelectionPosition) -> CellAction {
        self.inner.select_on_creation(index, position)
    }
}

impl fmt::Debug for TokenEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEditor")
            .field("tokens", &self.inner.tokens.borrow())
            .field("placeholder", &self.inner.placeholder.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl EditorInner {
    pub(super) fn token_cells(&self) -> Vec<TextCell> {
        if self.placeholder.borrow().is_some() {
            return Vec::new();
        }
        self.target
            .children()
            .iter()
            .filter_map(TextCell::from_cell)
            .collect()
    }

    pub(super) fn token_cell(&self, index: usize) -> Option<TextCell> {
        self.token_cells().into_iter().nth(index)
    }

    pub(super) fn index_of(&self, cell: &Cell) -> Option<usize> {
        self.token_cells().iter().position(|t| t.cell() == cell)
    }

    pub(super) fn token_count(&self) -> usize {
        self.tokens.borrow().len()
    }

    /// Replace `range` of the token list (clamped to its length).
    pub(super) fn splice(&self, range: Range<usize>, tokens: Vec<Token>) {
        let mut list = self.tokens.borrow_mut();
        let start = range.start.min(list.len());
        let end = range.end.clamp(start, list.len());
        list.splice(start..end, tokens);
    }

    pub(super) fn context(&self, target_index: Option<usize>) -> CompletionContext {
        let Some(target_index) = target_index else {
            return CompletionContext::default();
        };
        let tokens = self.tokens.borrow().clone();
        let end = target_index.min(tokens.len());
        CompletionContext {
            target_index,
            prefix: tokens[..end].to_vec(),
            views: self
                .token_cells()
                .into_iter()
                .take(end)
                .map(|t| t.cell().clone())
                .collect(),
            tokens,
        }
    }

    pub(super) fn update(self: &Rc<Self>) {
        let tokens = self.tokens.borrow().clone();
        *self.placeholder.borrow_mut() = None;
        self.target.clear_children();

        if tokens.is_empty() {
            let placeholder = self.placeholder_cell();
            self.target.add_child(placeholder.cell().clone());
            *self.placeholder.borrow_mut() = Some(placeholder);
        } else {
            for token in &tokens {
                self.target.add_child(self.token_cell_for(token).cell().clone());
            }
        }
        trace!(tokens = tokens.len(), "tokens printed");
    }

    pub(super) fn select_on_creation(
        self: &Rc<Self>,
        index: usize,
        position: SelectionPosition,
    ) -> CellAction {
        let editor = Rc::downgrade(self);
        CellAction::new(move || {
            let Some(cell) = editor.upgrade().and_then(|e| e.token_cell(index)) else {
                return;
            };
            match position {
                SelectionPosition::First => action::to_home(&cell).execute(),
                SelectionPosition::Last => action::to_end(&cell).execute(),
            }
        })
    }

    fn token_cell_for(self: &Rc<Self>, token: &Token) -> TextCell {
        let cell = TextCell::with_text(token.text());
        let completion = TokenCompletion::new(Rc::downgrade(self));
        let validator = {
            let completion = completion.clone();
            move |text: &str| text.is_empty() || completion.complete_token(text).is_some()
        };
        let _ = cell.add_trait(Rc::new(TokenCellTrait {
            editor: Rc::downgrade(self),
            completion,
            base: [valid_text_editing(validator), completion_support()],
        }));
        cell
    }

    fn placeholder_cell(self: &Rc<Self>) -> TextCell {
        let cell = TextCell::new();
        let _ = cell.add_trait(Rc::new(PlaceholderTrait {
            editor: Rc::downgrade(self),
            base: [text_editing(), completion_support()],
        }));
        cell
    }

    /// Re-read the token printed by `cell` after its text was edited.
    fn sync_token(&self, cell: &Cell, text: &str, completion: &TokenCompletion) {
        let Some(index) = self.index_of(cell) else {
            return;
        };
        let token = completion
            .complete_token(text)
            .unwrap_or_else(|| Token::error(text));
        let mut tokens = self.tokens.borrow_mut();
        if let Some(slot) = tokens.get_mut(index)
            && *slot != token
        {
            trace!(index, text, "token edited");
            *slot = token;
        }
    }
}

struct TokenCellTrait {
    editor: Weak<EditorInner>,
    completion: TokenCompletion,
    base: [Rc<dyn CellTrait>; 2],
}

impl CellTrait for TokenCellTrait {
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &self.base
    }

    fn property(&self, cell: &Cell, key: PropertyKey) -> Lookup {
        if COMPLETION.is(key) {
            return Lookup::value(self.completion.token_completion(cell));
        }
        if LEFT_TRANSFORM.is(key) {
            return Lookup::value(self.completion.side_transform(cell, 0));
        }
        if RIGHT_TRANSFORM.is(key) {
            return Lookup::value(self.completion.side_transform(cell, 1));
        }
        Lookup::Unset
    }

    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {
        if let Some(text) = change.of(&TEXT)
            && let Some(editor) = self.editor.upgrade()
        {
            editor.sync_token(cell, text.new, &self.completion);
        }
    }
}

/// The empty cell shown instead of tokens. A typed text that names a token
/// becomes the first token.
struct PlaceholderTrait {
    editor: Weak<EditorInner>,
    base: [Rc<dyn CellTrait>; 2],
}

impl PlaceholderTrait {
    fn commit_typed(editor: &Weak<EditorInner>, cell: &WeakCell) -> bool {
        let (Some(editor), Some(cell)) = (editor.upgrade(), cell.upgrade()) else {
            return false;
        };
        let Some(text) = TextCell::from_cell(&cell).map(|t| t.text()) else {
            return false;
        };
        let Some(token) = TokenCompletion::new(Rc::downgrade(&editor)).complete_token(&text) else {
            return false;
        };
        editor.splice(0..0, vec![token]);
        editor.update();
        editor.select_on_creation(0, SelectionPosition::Last).execute();
        true
    }
}

impl CellTrait for PlaceholderTrait {
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &self.base
    }

    fn property(&self, cell: &Cell, key: PropertyKey) -> Lookup {
        if COMPLETION.is(key) {
            let completion = TokenCompletion::new(self.editor.clone());
            return Lookup::value(completion.placeholder_completion());
        }
        if AFTER_TYPE.is(key) {
            let editor = self.editor.clone();
            let cell = cell.downgrade();
            let hook: AfterType = Rc::new(move || Self::commit_typed(&editor, &cell));
            return Lookup::value(Some(hook));
        }
        Lookup::Unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionSupplier;
    use crate::container::CellContainer;
    use crate::token::TokenHandler;

    struct Digits;

    impl TokenCompletionSpec for Digits {
        fn token_completion(&self, handler: TokenHandler) -> CompletionSupplier {
            use crate::completion::SimpleCompletionItem;
            CompletionSupplier::new(move |_| {
                (0..10)
                    .map(|d| {
                        let handler = Rc::clone(&handler);
                        SimpleCompletionItem::new(d.to_string(), move |text| {
                            handler(Token::number(text))
                        })
                        .into_ref()
                    })
                    .collect()
            })
        }
    }

    fn editor() -> (CellContainer, TokenEditor) {
        let container = CellContainer::new();
        let editor = TokenEditor::new(Rc::new(Digits));
        container.root().add_child(editor.cell());
        (container, editor)
    }

    #[test]
    fn empty_list_prints_placeholder() {
        let (_container, editor) = editor();
        assert!(editor.placeholder().is_some());
        assert!(editor.token_cells().is_empty());
        assert_eq!(editor.cell().child_count(), 1);
    }

    #[test]
    fn tokens_print_one_cell_each() {
        let (_container, editor) = editor();
        editor.set_tokens(vec![Token::number("1"), Token::number("2")]);
        assert!(editor.placeholder().is_none());
        let texts: Vec<String> = editor.token_cells().iter().map(TextCell::text).collect();
        assert_eq!(texts, ["1", "2"]);
    }

    #[test]
    fn editing_a_cell_updates_its_token() {
        let (_container, editor) = editor();
        editor.set_tokens(vec![Token::number("1")]);
        let _ = editor.token_cells()[0].set_text("x");
        assert_eq!(editor.tokens(), vec![Token::error("x")]);
        let _ = editor.token_cells()[0].set_text("7");
        assert_eq!(editor.tokens(), vec![Token::number("7")]);
    }

    #[test]
    fn typing_into_placeholder_creates_token() {
        let (container, editor) = editor();
        editor.placeholder().expect("placeholder").focus();
        assert!(container.key_typed(cellkit_core::KeyEvent::typed('4')));
        assert_eq!(editor.tokens(), vec![Token::number("4")]);
        let cell = &editor.token_cells()[0];
        assert!(cell.is_focused());
        assert!(cell.is_end());
    }

    #[test]
    fn select_on_creation_places_caret() {
        let (_container, editor) = editor();
        editor.set_tokens(vec![Token::identifier("abc")]);
        editor.select_on_creation(0, SelectionPosition::Last).execute();
        assert_eq!(editor.token_cells()[0].caret(), 3);
        editor.select_on_creation(0, SelectionPosition::First).execute();
        assert_eq!(editor.token_cells()[0].caret(), 0);
    }
}
