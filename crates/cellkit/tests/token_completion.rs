//! Token-position completion over a small expression vocabulary.

use std::rc::Rc;

use cellkit::cell::RIGHT_POPUP;
use cellkit::completion::{
    CompletionItemRef, CompletionParameters, CompletionSupplier, SimpleCompletionItem,
};
use cellkit::token::{Completer, CompletionContext, TokenCompletionSpec, TokenHandler};
use cellkit::{CellContainer, TextCell, Token, TokenEditor, TokenKind};
use cellkit_core::{KeyCode, KeyEvent};

/// Identifiers `a`, `ab`, `b`, operators `+`, `-` and the number `1`; the
/// menu also offers the whole expression `a+1`.
struct Expressions;

fn token_for(text: &str) -> Token {
    match text {
        "+" | "-" => Token::operator(text),
        "1" => Token::number(text),
        _ => Token::identifier(text),
    }
}

impl TokenCompletionSpec for Expressions {
    fn token_completion(&self, handler: TokenHandler) -> CompletionSupplier {
        CompletionSupplier::new(move |_| {
            ["a", "ab", "b", "+", "-", "1"]
                .into_iter()
                .map(|text| {
                    let handler = Rc::clone(&handler);
                    SimpleCompletionItem::new(text, move |_| handler(token_for(text))).into_ref()
                })
                .collect()
        })
    }

    fn additional_completion(
        &self,
        context: &CompletionContext,
        completer: Completer,
    ) -> CompletionSupplier {
        let after_operator = context
            .prefix
            .last()
            .is_some_and(|token| token.kind() == TokenKind::Operator);
        CompletionSupplier::new(move |_| {
            if after_operator {
                return Vec::new();
            }
            let completer = completer.clone();
            vec![
                SimpleCompletionItem::new("a+1", move |_| {
                    completer.complete_selecting(
                        2,
                        vec![Token::identifier("a"), Token::operator("+"), Token::number("1")],
                    )
                })
                .into_ref(),
            ]
        })
    }
}

fn editor() -> (CellContainer, TokenEditor) {
    let container = CellContainer::new();
    let editor = TokenEditor::new(Rc::new(Expressions));
    container.root().add_child(editor.cell());
    (container, editor)
}

fn texts(editor: &TokenEditor) -> Vec<String> {
    editor.tokens().iter().map(|t| t.text().to_string()).collect()
}

fn pick(items: &[CompletionItemRef], text: &str) -> CompletionItemRef {
    items
        .iter()
        .find(|item| item.is_match(text))
        .cloned()
        .unwrap_or_else(|| panic!("no item for {text:?}"))
}

fn cell(editor: &TokenEditor, index: usize) -> TextCell {
    editor.token_cells()[index].clone()
}

// ═══════════════════════════════════════════════════════════════════════
// complete_token
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn complete_token_requires_exact_single_match() {
    let (_container, editor) = editor();
    let completion = editor.completion();
    assert_eq!(completion.complete_token("a"), Some(Token::identifier("a")));
    assert_eq!(completion.complete_token("+"), Some(Token::operator("+")));
    assert_eq!(completion.complete_token("1"), Some(Token::number("1")));
    assert_eq!(completion.complete_token("zz"), None);
    assert_eq!(completion.complete_token(""), None);
}

// ═══════════════════════════════════════════════════════════════════════
// In-place completion
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn same_text_keeps_caret_offset() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("ab")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(1);

    let items = editor
        .completion()
        .token_completion(target.cell())
        .get(&CompletionParameters::default());
    pick(&items, "ab").complete("a").execute();

    let replaced = cell(&editor, 0);
    assert_ne!(replaced, target);
    assert!(replaced.is_focused());
    assert_eq!(replaced.caret(), 1);
}

#[test]
fn caret_at_start_stays_at_start() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("ab")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(0);

    let items = editor
        .completion()
        .token_completion(target.cell())
        .get(&CompletionParameters::default());
    pick(&items, "ab").complete("").execute();
    assert_eq!(cell(&editor, 0).caret(), 0);
}

#[test]
fn changed_text_moves_caret_to_end() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a"), Token::operator("+")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(0);

    let items = editor
        .completion()
        .token_completion(target.cell())
        .get(&CompletionParameters::default());
    pick(&items, "ab").complete("a").execute();

    assert_eq!(texts(&editor), ["ab", "+"]);
    let replaced = cell(&editor, 0);
    assert!(replaced.is_focused());
    assert!(replaced.is_end());
}

#[test]
fn menu_items_include_additional_completion() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("b")]);
    let target = cell(&editor, 0);
    let completion = editor.completion();
    let supplier = completion.token_completion(target.cell());

    let inline = supplier.get(&CompletionParameters::default());
    assert!(inline.iter().all(|item| !item.is_match("a+1")));
    let menu = supplier.get(&CompletionParameters::menu());
    pick(&menu, "a+1").complete("").execute();

    assert_eq!(texts(&editor), ["a", "+", "1"]);
    assert!(cell(&editor, 2).is_focused());
}

#[test]
fn menu_commit_reopens_completion_while_ambiguous() {
    let (container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(0);

    assert!(container.complete(true));
    assert!(target.front_popup().is_some());
    assert!(container.key_typed(KeyEvent::typed('a')));
    assert!(container.key_pressed(KeyEvent::new(KeyCode::Enter)));

    // Caret 0 on the new `a`: every item still matches the empty prefix.
    assert_eq!(editor.tokens(), vec![Token::identifier("a")]);
    let replaced = cell(&editor, 0);
    assert_ne!(replaced, target);
    assert_eq!(replaced.caret(), 0);
    assert!(replaced.front_popup().is_some());
}

#[test]
fn menu_commit_stays_closed_on_unique_match() {
    let (container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("ab")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(2);

    assert!(container.complete(true));
    for ch in "ab".chars() {
        assert!(container.key_typed(KeyEvent::typed(ch)));
    }
    assert!(container.key_pressed(KeyEvent::new(KeyCode::Enter)));

    assert_eq!(editor.tokens(), vec![Token::identifier("ab")]);
    let replaced = cell(&editor, 0);
    assert!(replaced.is_focused());
    assert!(replaced.is_end());
    assert!(replaced.front_popup().is_none());
}

#[test]
fn inline_commit_never_reopens_completion() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(0);

    let items = editor
        .completion()
        .token_completion(target.cell())
        .get(&CompletionParameters::default());
    pick(&items, "a").complete("a").execute();

    let replaced = cell(&editor, 0);
    assert!(replaced.is_focused());
    assert!(replaced.front_popup().is_none());
}

// ═══════════════════════════════════════════════════════════════════════
// Placeholder
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn placeholder_completion_appends_tokens() {
    let (_container, editor) = editor();
    let items = editor
        .completion()
        .placeholder_completion()
        .get(&CompletionParameters::menu());
    pick(&items, "a+1").complete("").execute();

    assert!(editor.placeholder().is_none());
    assert_eq!(texts(&editor), ["a", "+", "1"]);
    let last = cell(&editor, 2);
    assert!(last.is_focused());
    assert!(last.is_end());
}

#[test]
fn placeholder_menu_commits_through_the_popup() {
    let (container, editor) = editor();
    let placeholder = editor.placeholder().expect("placeholder shown");
    placeholder.focus();
    assert!(container.complete(true));
    assert!(placeholder.front_popup().is_some());

    for ch in "ab".chars() {
        assert!(container.key_typed(KeyEvent::typed(ch)));
    }
    assert!(container.key_pressed(KeyEvent::new(KeyCode::Enter)));

    assert_eq!(editor.tokens(), vec![Token::identifier("ab")]);
    assert!(cell(&editor, 0).is_focused());
}

// ═══════════════════════════════════════════════════════════════════════
// Side transforms
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn side_transform_inserts_before_or_after() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let completion = editor.completion();
    let params = CompletionParameters::default();

    let after = completion.side_transform(cell(&editor, 0).cell(), 1).get(&params);
    pick(&after, "+").complete("+").execute();
    assert_eq!(texts(&editor), ["a", "+"]);
    assert!(cell(&editor, 1).is_focused());

    let before = completion.side_transform(cell(&editor, 0).cell(), 0).get(&params);
    pick(&before, "-").complete("-").execute();
    assert_eq!(texts(&editor), ["-", "a", "+"]);
    assert!(cell(&editor, 0).is_focused());
}

#[test]
fn end_right_transform_reopens_completion_while_ambiguous() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let completion = editor.completion();
    let params = CompletionParameters {
        menu: false,
        end_right_transform: true,
    };

    let items = completion.side_transform(cell(&editor, 0).cell(), 1).get(&params);
    pick(&items, "+").complete("+").execute();
    assert_eq!(texts(&editor), ["a", "+"]);
    assert!(cell(&editor, 1).front_popup().is_none());

    // `a` also begins `ab`, so the menu opens on the new token.
    let items = completion.side_transform(cell(&editor, 1).cell(), 1).get(&params);
    pick(&items, "a").complete("a").execute();
    assert_eq!(texts(&editor), ["a", "+", "a"]);
    let last = cell(&editor, 2);
    assert!(last.is_focused());
    assert!(last.front_popup().is_some());
}

#[test]
fn side_transform_of_unknown_cell_is_empty() {
    let (_container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let stranger = TextCell::with_text("a");
    let items = editor
        .completion()
        .side_transform(stranger.cell(), 1)
        .get(&CompletionParameters::default());
    assert!(items.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Typing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn typing_an_expression_builds_tokens() {
    let (container, editor) = editor();
    editor.placeholder().expect("placeholder shown").focus();
    for ch in "a+b".chars() {
        assert!(container.key_typed(KeyEvent::typed(ch)), "typing {ch:?}");
    }

    // `a` and `+` are committed; `b` waits in the side transform of `+`.
    assert_eq!(texts(&editor), ["a", "+"]);
    assert!(cell(&editor, 1).get(&RIGHT_POPUP).is_some());

    assert!(container.key_pressed(KeyEvent::new(KeyCode::Enter)));
    assert_eq!(
        editor.tokens(),
        vec![Token::identifier("a"), Token::operator("+"), Token::identifier("b")]
    );
    let last = cell(&editor, 2);
    assert!(last.is_focused());
    assert!(last.is_end());
}

#[test]
fn typing_inside_a_token_keeps_it_in_sync() {
    let (container, editor) = editor();
    editor.set_tokens(vec![Token::identifier("a")]);
    let target = cell(&editor, 0);
    target.focus();
    let _ = target.set_caret(1);

    assert!(container.key_typed(KeyEvent::typed('b')));
    assert_eq!(editor.tokens(), vec![Token::identifier("ab")]);
    assert!(container.key_pressed(KeyEvent::new(KeyCode::Backspace)));
    assert!(container.key_pressed(KeyEvent::new(KeyCode::Backspace)));
    assert_eq!(editor.tokens(), vec![Token::error("")]);
}
