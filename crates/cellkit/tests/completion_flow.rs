//! Completion menus and side transforms driven through the container's
//! input surface.

use std::cell::RefCell;
use std::rc::Rc;

use cellkit::action::{self, CellAction};
use cellkit::cell::{FOCUSABLE, RIGHT_POPUP};
use cellkit::completion::{
    COMPLETION, COMPLETION_CONTROLLER, CompletionController, CompletionItem, CompletionItemRef,
    CompletionMenuModel, CompletionSupplier, RIGHT_TRANSFORM, SimpleCompletionItem,
    completion_support,
};
use cellkit::text::TEXT;
use cellkit::text::editing::{text_editing, valid_text_editing};
use cellkit::{
    Cell, CellContainer, CellKind, CellListener, CellTrait, EditorConfig, Lookup, PropertyChange,
    PropertyKey, TextCell,
};
use cellkit_core::{KeyCode, KeyEvent, Modifiers};

// ── Helpers ─────────────────────────────────────────────────────────────

type Log = Rc<RefCell<Vec<String>>>;

/// Answers completion and right-transform suppliers.
struct Offers {
    completion: CompletionSupplier,
    right: CompletionSupplier,
}

impl CellTrait for Offers {
    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if COMPLETION.is(key) {
            return Lookup::value(self.completion.clone());
        }
        if RIGHT_TRANSFORM.is(key) {
            return Lookup::value(self.right.clone());
        }
        Lookup::Unset
    }
}

#[derive(Default)]
struct TextEdits {
    count: RefCell<usize>,
}

impl CellListener for TextEdits {
    fn on_property_changed(&self, _cell: &Cell, change: &PropertyChange<'_>) {
        if change.of(&TEXT).is_some() {
            *self.count.borrow_mut() += 1;
        }
    }
}

/// Items that replace `target`'s text with their label.
fn replacing(texts: &[&'static str], target: &TextCell, log: &Log) -> Vec<CompletionItemRef> {
    texts
        .iter()
        .map(|&label| {
            let target = target.clone();
            let log = Rc::clone(log);
            SimpleCompletionItem::new(label, move |_| {
                log.borrow_mut().push(label.to_string());
                let _ = target.set_text(label);
                action::to_end(&target)
            })
            .into_ref()
        })
        .collect()
}

/// Items that append their label to `target`'s text.
fn appending(texts: &[&'static str], target: &TextCell, log: &Log) -> Vec<CompletionItemRef> {
    texts
        .iter()
        .map(|&label| {
            let target = target.clone();
            let log = Rc::clone(log);
            SimpleCompletionItem::new(label, move |_| {
                log.borrow_mut().push(label.to_string());
                let _ = target.set_text(format!("{}{label}", target.text()));
                action::to_end(&target)
            })
            .into_ref()
        })
        .collect()
}

fn item(text: &str) -> CompletionItemRef {
    SimpleCompletionItem::new(text, |_| CellAction::empty()).into_ref()
}

/// Listed whatever was typed, never an exact match.
struct AnyText(&'static str);

impl CompletionItem for AnyText {
    fn visible_text(&self, _text: &str) -> String {
        self.0.to_string()
    }

    fn is_strict_match_prefix(&self, _text: &str) -> bool {
        false
    }

    fn is_match_prefix(&self, _text: &str) -> bool {
        true
    }

    fn is_match(&self, _text: &str) -> bool {
        false
    }

    fn complete(&self, _text: &str) -> CellAction {
        CellAction::empty()
    }
}

fn labels(model: &CompletionMenuModel) -> Vec<String> {
    model
        .visible_items()
        .iter()
        .map(|item| item.visible_text(""))
        .collect()
}

fn child_texts(cell: &Cell) -> Vec<String> {
    cell.children()
        .iter()
        .filter_map(TextCell::from_cell)
        .map(|text| text.text())
        .collect()
}

fn type_text(container: &CellContainer, text: &str) {
    for ch in text.chars() {
        assert!(container.key_typed(KeyEvent::typed(ch)), "typing {ch:?}");
    }
}

fn press(container: &CellContainer, code: KeyCode) -> bool {
    container.key_pressed(KeyEvent::new(code))
}

fn focused_text(container: &CellContainer) -> TextCell {
    container
        .focused_cell()
        .and_then(|cell| TextCell::from_cell(&cell))
        .expect("a text cell holds focus")
}

struct MenuFixture {
    container: CellContainer,
    target: TextCell,
    log: Log,
    edits: Rc<TextEdits>,
}

/// A focused, empty text cell whose menu offers `items`.
fn menu_fixture(items: &[&'static str], config: EditorConfig) -> MenuFixture {
    let container = CellContainer::with_config(config);
    let target = TextCell::new();
    let log = Log::default();
    let supplied = replacing(items, &target, &log);
    let _ = target.add_trait(Rc::new(Offers {
        completion: CompletionSupplier::from_items(supplied),
        right: CompletionSupplier::empty(),
    }));
    let _ = target.add_trait(completion_support());
    let _ = target.add_trait(text_editing());
    let edits = Rc::new(TextEdits::default());
    let _ = target.add_listener(edits.clone());
    container.root().add_child(target.cell().clone());
    target.focus();
    MenuFixture {
        container,
        target,
        log,
        edits,
    }
}

/// A focused text cell accepting alphanumerics whose right side transform
/// offers `items`, each appending its label.
fn side_fixture(items: &[&'static str]) -> (CellContainer, TextCell, Log) {
    let container = CellContainer::new();
    let host = TextCell::new();
    let log = Log::default();
    let supplied = appending(items, &host, &log);
    let _ = host.add_trait(Rc::new(Offers {
        completion: CompletionSupplier::empty(),
        right: CompletionSupplier::from_items(supplied),
    }));
    let _ = host.add_trait(valid_text_editing(|text| {
        text.chars().all(char::is_alphanumeric)
    }));
    container.root().add_child(host.cell().clone());
    host.focus();
    (container, host, log)
}

// ═══════════════════════════════════════════════════════════════════════
// Menu model
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn menu_lists_prefix_matches() {
    let model = CompletionMenuModel::new(vec![item("abc"), item("abd"), item("xyz")]);
    model.set_text("ab");
    assert_eq!(labels(&model), ["abc", "abd"]);
    let selected = model.selected_item().expect("first visible item selected");
    assert_eq!(selected.visible_text("ab"), "abc");

    model.set_text("abd");
    assert_eq!(labels(&model), ["abd"]);
}

#[test]
fn menu_without_matches_is_empty_unless_items_accept_anything() {
    let model = CompletionMenuModel::new(vec![item("abc"), item("xyz")]);
    model.set_text("z");
    assert!(labels(&model).is_empty());
    assert!(model.selected_item().is_none());

    let fallback: CompletionItemRef = Rc::new(AnyText("did you mean xyz"));
    model.set_items(vec![item("abc"), item("xyz"), fallback]);
    assert_eq!(labels(&model), ["did you mean xyz"]);
    assert!(model.selected_item().is_some());
}

// ═══════════════════════════════════════════════════════════════════════
// Menu sessions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn enter_commits_selected_item_once() {
    let f = menu_fixture(&["abc", "abd", "xyz"], EditorConfig::default());
    assert!(f.container.complete(true));
    let popup = f.target.front_popup().expect("completion popup");
    let field = focused_text(&f.container);
    assert!(popup.is_ancestor_of(field.cell()));

    type_text(&f.container, "ab");
    let menu = field.bottom_popup().expect("menu view");
    assert_eq!(child_texts(&menu), ["abc", "abd"]);

    assert!(press(&f.container, KeyCode::Down));
    assert!(press(&f.container, KeyCode::Enter));

    assert!(f.target.front_popup().is_none());
    assert!(f.target.is_focused());
    assert_eq!(f.target.text(), "abd");
    assert_eq!(*f.log.borrow(), ["abd"]);
    assert_eq!(*f.edits.count.borrow(), 1);
}

#[test]
fn escape_cancels_without_edits() {
    let f = menu_fixture(&["abc", "abd"], EditorConfig::default());
    assert!(f.container.complete(true));
    type_text(&f.container, "a");
    assert!(press(&f.container, KeyCode::Escape));

    assert!(f.target.front_popup().is_none());
    assert!(f.target.is_focused());
    assert!(f.log.borrow().is_empty());
    assert_eq!(*f.edits.count.borrow(), 0);
}

#[test]
fn ctrl_space_opens_menu() {
    let f = menu_fixture(&["abc"], EditorConfig::default());
    let shortcut = KeyEvent::new(KeyCode::Char(' ')).with_modifiers(Modifiers::CTRL);
    assert!(f.container.key_pressed(shortcut));
    assert!(f.target.front_popup().is_some());
}

#[test]
fn controller_toggles_menu() {
    let f = menu_fixture(&["abc", "abd"], EditorConfig::default());
    let controller = f
        .target
        .get_trait(&COMPLETION_CONTROLLER)
        .expect("completion support answers a controller");
    assert!(controller.can_activate());
    assert!(controller.has_ambiguous_matches());

    controller.set_active(true);
    assert!(controller.is_active());
    controller.set_active(false);
    assert!(!controller.is_active());
    assert!(f.target.is_focused());
}

#[test]
fn focus_loss_closes_menu() {
    let f = menu_fixture(&["abc"], EditorConfig::default());
    let other = Cell::new(CellKind::Generic);
    let _ = other.set(&FOCUSABLE, true);
    f.container.root().add_child(other.clone());

    assert!(f.container.complete(true));
    other.focus();
    assert!(f.target.front_popup().is_none());
    assert!(f.log.borrow().is_empty());

    // Closing on focus loss leaves focus where it went.
    assert!(other.is_focused());
    assert!(!f.target.is_focused());
    assert_eq!(f.container.focused_cell(), Some(other));
}

#[test]
fn enter_commits_single_exact_match_inline() {
    let f = menu_fixture(&["if", "iff"], EditorConfig::default());
    type_text(&f.container, "if");
    assert!(f.log.borrow().is_empty());
    assert!(press(&f.container, KeyCode::Enter));
    assert_eq!(*f.log.borrow(), ["if"]);
}

#[test]
fn eager_config_commits_while_typing() {
    let f = menu_fixture(&["if", "iff"], EditorConfig::default().with_eager_completion(true));
    type_text(&f.container, "if");
    assert_eq!(*f.log.borrow(), ["if"]);
}

// ═══════════════════════════════════════════════════════════════════════
// Side transforms
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn invalid_character_opens_right_transform() {
    let (container, host, _log) = side_fixture(&["+", "++"]);
    type_text(&container, "a+");

    assert!(host.get(&RIGHT_POPUP).is_some());
    assert_eq!(host.text(), "a");
    let field = focused_text(&container);
    assert_eq!(field.text(), "+");
    assert!(field.is_end());
}

#[test]
fn emptying_the_field_dismisses_and_restores() {
    let (container, host, log) = side_fixture(&["+", "++"]);
    type_text(&container, "a+");
    assert!(press(&container, KeyCode::Backspace));

    assert!(host.get(&RIGHT_POPUP).is_none());
    assert!(host.is_focused());
    assert_eq!(host.text(), "a");
    assert_eq!(host.caret(), 1);
    assert!(log.borrow().is_empty());
}

#[test]
fn escape_dismisses_side_transform() {
    let (container, host, log) = side_fixture(&["+"]);
    type_text(&container, "a+");
    assert!(press(&container, KeyCode::Escape));
    assert!(host.get(&RIGHT_POPUP).is_none());
    assert!(host.is_focused());
    assert!(log.borrow().is_empty());
}

#[test]
fn single_match_commits_once_nothing_extends_it() {
    let (container, host, log) = side_fixture(&["+", "++"]);
    type_text(&container, "a++");

    assert_eq!(*log.borrow(), ["++"]);
    assert_eq!(host.text(), "a++");
    assert!(host.is_focused());
    assert!(host.get(&RIGHT_POPUP).is_none());
}

#[test]
fn unmatched_suffix_splits_and_replays() {
    let (container, host, log) = side_fixture(&["+", "++"]);
    type_text(&container, "a+b");

    assert_eq!(*log.borrow(), ["+"]);
    assert_eq!(host.text(), "a+b");
    assert!(host.is_end());
    assert!(host.get(&RIGHT_POPUP).is_none());
}

#[test]
fn enter_commits_side_transform() {
    let (container, host, log) = side_fixture(&["+", "++"]);
    type_text(&container, "a+");
    assert!(press(&container, KeyCode::Enter));
    assert_eq!(*log.borrow(), ["+"]);
    assert_eq!(host.text(), "a+");
    assert!(host.get(&RIGHT_POPUP).is_none());
}
