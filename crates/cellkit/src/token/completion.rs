#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::action::{self, CellAction};
use crate::cell::{Cell, WeakCell};
use crate::completion::{
    COMPLETION_CONTROLLER, CompletionHelper, CompletionParameters, CompletionSupplier,
};
use crate::text::TextCell;
use crate::token::editor::EditorInner;
use crate::token::{Completer, SelectionPosition, Token, TokenHandler};

/// Completion suppliers for the positions of a [`crate::token::TokenEditor`].
#[derive(Clone)]
pub struct TokenCompletion {
    editor: Weak<EditorInner>,
}

impl TokenCompletion {
    pub(super) fn new(editor: Weak<EditorInner>) -> Self {
        Self { editor }
    }

    /// Single-token items, each reporting its token to `handler`.
    #[must_use]
    pub fn completion(&self, handler: TokenHandler) -> CompletionHelper {
        let Some(editor) = self.editor.upgrade() else {
            return CompletionHelper::default();
        };
        let items = editor
            .spec
            .token_completion(handler)
            .get(&CompletionParameters::default());
        CompletionHelper::new(items)
    }

    /// Items for the empty editor; committing appends the tokens.
    #[must_use]
    pub fn placeholder_completion(&self) -> CompletionSupplier {
        let this = self.clone();
        let completer = Completer::new(move |selection_index, tokens| {
            let Some(editor) = this.editor.upgrade() else {
                return CellAction::empty();
            };
            let end = editor.token_count();
            editor.splice(end..end, tokens);
            editor.update();
            editor.select_on_creation(selection_index, SelectionPosition::Last)
        });
        self.supplier(None, completer)
    }

    /// Items replacing the token printed by `token_cell`.
    ///
    /// The caret keeps its offset when the replacement at the selected
    /// index prints the same text; otherwise it goes to the end. Items
    /// fetched for the completion menu reopen it on the new token while
    /// more than one item still matches there.
    #[must_use]
    pub fn token_completion(&self, token_cell: &Cell) -> CompletionSupplier {
        let Some(index) = self.editor.upgrade().and_then(|e| e.index_of(token_cell)) else {
            return CompletionSupplier::empty();
        };
        let this = self.clone();
        let cell = token_cell.downgrade();
        CompletionSupplier::new(move |params| {
            // Menu items are only committed from an open menu, which has
            // already been closed by the time the completer runs.
            let completer = this.in_place_completer(index, cell.clone(), params.menu);
            this.supplier(Some(index), completer).get(params)
        })
    }

    fn in_place_completer(&self, index: usize, cell: WeakCell, reactivate: bool) -> Completer {
        let this = self.clone();
        Completer::new(move |selection_index, tokens| {
            let (Some(editor), Some(cell)) = (this.editor.upgrade(), cell.upgrade()) else {
                return CellAction::empty();
            };
            let old = TextCell::from_cell(&cell).map(|text| (text.caret(), text.text()));
            let len = TextCell::from_cell(&cell).map_or(0, |text| text.len());
            let position = match &old {
                Some((0, _)) => Some(SelectionPosition::First),
                Some((caret, _)) if *caret == len => Some(SelectionPosition::Last),
                Some(_) => None,
                None => Some(SelectionPosition::Last),
            };

            editor.splice(index..index + 1, tokens);
            editor.update();

            let target_index = index + selection_index;
            let target = editor.token_cell(target_index);
            let same_text = match (&target, &old) {
                (Some(target), Some((_, text))) => target.text() == *text,
                _ => false,
            };
            debug!(index, target_index, same_text, "token completed in place");
            let result = match (position, target, &old) {
                (None, Some(target), Some((caret, _))) if same_text => {
                    action::to_position(&target, *caret)
                }
                (Some(position), _, _) if same_text => {
                    editor.select_on_creation(target_index, position)
                }
                _ => editor.select_on_creation(target_index, SelectionPosition::Last),
            };
            if reactivate {
                result.then(this.activate_completion(target_index))
            } else {
                result
            }
        })
    }

    /// Items inserting tokens `delta` positions after the start of the
    /// token printed by `token_cell`: 0 inserts before it, 1 after it.
    #[must_use]
    pub fn side_transform(&self, token_cell: &Cell, delta: usize) -> CompletionSupplier {
        let Some(index) = self.editor.upgrade().and_then(|e| e.index_of(token_cell)) else {
            return CompletionSupplier::empty();
        };
        let this = self.clone();
        CompletionSupplier::new(move |params| {
            let params = *params;
            let insert_at = index + delta;
            let completer = {
                let this = this.clone();
                Completer::new(move |selection_index, tokens| {
                    let Some(editor) = this.editor.upgrade() else {
                        return CellAction::empty();
                    };
                    editor.splice(insert_at..insert_at, tokens);
                    editor.update();
                    let target_index = insert_at + selection_index;
                    let result = editor.select_on_creation(target_index, SelectionPosition::Last);
                    if params.end_right_transform {
                        result.then(this.activate_completion(target_index))
                    } else {
                        result
                    }
                })
            };
            let context_index = if params.end_right_transform {
                index + 1
            } else {
                insert_at
            };
            this.supplier(Some(context_index), completer).get(&params)
        })
    }

    /// The token `text` names, when exactly one item matches it.
    #[must_use]
    pub fn complete_token(&self, text: &str) -> Option<Token> {
        let result = Rc::new(RefCell::new(None));
        let helper = {
            let result = Rc::clone(&result);
            self.completion(Rc::new(move |token: Token| {
                *result.borrow_mut() = Some(token);
                CellAction::empty()
            }))
        };
        if let [item] = helper.matches(text).as_slice() {
            item.complete(text).execute();
        }
        result.take()
    }

    /// Single-token items, plus the `TokenCompletionSpec` extras in menu
    /// mode. `target` is the insertion index, `None` for the placeholder.
    fn supplier(&self, target: Option<usize>, completer: Completer) -> CompletionSupplier {
        let editor = self.editor.clone();
        CompletionSupplier::new(move |params| {
            let Some(editor) = editor.upgrade() else {
                return Vec::new();
            };
            let handler: TokenHandler = {
                let completer = completer.clone();
                Rc::new(move |token: Token| completer.complete(vec![token]))
            };
            let mut items = editor.spec.token_completion(handler).get(params);
            if params.menu {
                let context = editor.context(target);
                items.extend(
                    editor
                        .spec
                        .additional_completion(&context, completer.clone())
                        .get(params),
                );
            }
            items
        })
    }

    /// Reopen completion on the token at `index` while it is ambiguous.
    fn activate_completion(&self, index: usize) -> CellAction {
        let editor = self.editor.clone();
        CellAction::new(move || {
            let Some(cell) = editor.upgrade().and_then(|e| e.token_cell(index)) else {
                return;
            };
            if let Some(controller) = cell.get_trait(&COMPLETION_CONTROLLER)
                && controller.has_ambiguous_matches()
            {
                debug!(index, "completion reactivated");
                controller.set_active(true);
            }
        })
    }
}

impl fmt::Debug for TokenCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCompletion")
            .field("attached", &(self.editor.strong_count() > 0))
            .finish()
    }
}
