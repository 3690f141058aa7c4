#![forbid(unsafe_code)]

//! Completion popups.
//!
//! # Sessions
//!
//! [`show_completion`] turns a focused text cell into a completion session:
//! the typed prefix drives a [`CompletionMenuModel`] shown in the cell's
//! bottom popup. Enter commits the selected item, Escape cancels, losing
//! focus closes the session. Commit and cancel both restore the container
//! state saved before the popup opened; commit then runs the item.
//!
//! [`show_side_transform_popup`] opens a text field in a side popup of a
//! cell. It dismisses itself when emptied, on Escape and on focus loss, and
//! commits eagerly: once the text minus its last character names exactly one
//! item and nothing extends the full text, that item is committed and the
//! last character is typed again at the new position.

use std::cell::{Cell as Flag, RefCell};
use std::rc::Rc;

use cellkit_core::{CompositeRegistration, Consumable, KeyCode, KeyEvent, Registration};
use tracing::debug;

use crate::action::CellAction;
use crate::cell::{BOTTOM_POPUP, Cell, FOCUSED, FRONT_POPUP, WeakCell};
use crate::cell_trait::CellTrait;
use crate::completion::menu::{self, CompletionMenuModel};
use crate::completion::{
    COMPLETION, COMPLETION_CONTROLLER, CompletionController, CompletionHelper, CompletionItem,
    CompletionItemRef, CompletionParameters, CompletionSupplier,
};
use crate::container::{CellContainer, ContainerState};
use crate::error::{CellError, fatal};
use crate::event::{CompletionEvent, FocusEvent};
use crate::property::{
    CellPropertySpec, CellTraitPropertySpec, Lookup, PropertyChange, PropertyKey,
};
use crate::text::editing::{AFTER_TYPE, AfterType, EAGER_COMPLETION, text_editing};
use crate::text::{CARET_POSITION, TEXT, TextCell};

/// Closes the completion session of the focused text field.
pub static HIDE_COMPLETION: CellTraitPropertySpec<Option<Rc<dyn Fn()>>> =
    CellTraitPropertySpec::new("hideCompletion", |_| None);

/// Trait that answers [`COMPLETION_CONTROLLER`] and opens the completion
/// popup on a completion request.
#[must_use]
pub fn completion_support() -> Rc<dyn CellTrait> {
    Rc::new(CompletionSupportTrait)
}

struct CompletionSupportTrait;

impl CellTrait for CompletionSupportTrait {
    fn property(&self, cell: &Cell, key: PropertyKey) -> Lookup {
        if COMPLETION_CONTROLLER.is(key) {
            let controller: Option<Rc<dyn CompletionController>> =
                Some(Rc::new(SupportController { cell: cell.clone() }));
            return Lookup::value(controller);
        }
        Lookup::Unset
    }

    fn on_complete(&self, cell: &Cell, event: &mut CompletionEvent) {
        if can_complete(cell) {
            let controller = SupportController { cell: cell.clone() };
            if controller.can_activate() {
                controller.set_active(true);
            }
            event.consume();
        }
    }
}

/// Completion activates only when the focused cell sits at the leftmost
/// position of `cell`: every link up to `cell` is a first child.
fn can_complete(cell: &Cell) -> bool {
    let Some(mut current) = cell.container().and_then(|c| c.focused_cell()) else {
        return false;
    };
    while &current != cell {
        let Some(parent) = current.parent() else {
            return false;
        };
        if parent.index_of(&current) != Some(0) {
            return false;
        }
        current = parent;
    }
    true
}

struct SupportController {
    cell: Cell,
}

impl CompletionController for SupportController {
    fn is_active(&self) -> bool {
        self.cell.front_popup().is_some()
    }

    fn can_activate(&self) -> bool {
        !self
            .cell
            .get_trait(&COMPLETION)
            .get(&CompletionParameters::default())
            .is_empty()
    }

    fn set_active(&self, active: bool) {
        if self.is_active() == active {
            return;
        }
        if active {
            let items = self
                .cell
                .get_trait(&COMPLETION)
                .get(&CompletionParameters::menu());
            debug!(items = items.len(), "completion activated");
            let _ = show_popup(&self.cell, &FRONT_POPUP, items);
            return;
        }
        let hide = self
            .cell
            .container()
            .and_then(|c| c.focused_cell())
            .and_then(|focused| focused.get_trait(&HIDE_COMPLETION));
        if let Some(hide) = hide {
            hide();
        }
    }

    fn has_ambiguous_matches(&self) -> bool {
        let text = TextCell::from_cell(&self.cell)
            .map(|t| t.prefix_text())
            .unwrap_or_default();
        self.cell
            .get_trait(&COMPLETION)
            .get(&CompletionParameters::default())
            .iter()
            .filter(|item| item.is_match_prefix(&text))
            .count()
            > 1
    }
}

fn require_container(cell: &Cell) -> CellContainer {
    match cell.container() {
        Some(container) => container,
        None => fatal(CellError::Detached),
    }
}

/// Open a completion field in `cell`'s `popup` slot and start a session
/// over `items`. Returns the focused field.
pub fn show_popup(
    cell: &Cell,
    popup: &'static CellPropertySpec<Option<Cell>>,
    items: Vec<CompletionItemRef>,
) -> TextCell {
    let container = require_container(cell);
    let holder = Cell::horizontal();
    let field = TextCell::new();
    let editing = field.add_trait(text_editing());

    holder.add_child(field.cell().clone());
    let _ = cell.set(popup, Some(holder.clone()));
    let state = container.save_state();
    field.focus();

    let on_close = Registration::new(move || {
        if holder.parent().is_some() {
            holder.remove_from_parent();
        }
        editing.remove();
    });
    show_completion(&field, items, on_close, state);
    field
}

/// Run a completion session on a focused text cell. `on_close` runs when
/// the session ends; `prev_state` is restored on commit and cancel.
pub fn show_completion(
    field: &TextCell,
    items: Vec<CompletionItemRef>,
    on_close: Registration,
    prev_state: ContainerState,
) {
    if !field.is_focused() {
        fatal(CellError::NotFocused);
    }
    let max_items = require_container(field).config().menu_max_items;
    let model = CompletionMenuModel::with_max_items(items, max_items);
    model.set_text(&field.prefix_text());

    let reg = Rc::new(CompositeRegistration::new());
    let prev_state = Rc::new(prev_state);

    let completer: Rc<dyn Fn(CompletionItemRef)> = {
        let reg = Rc::clone(&reg);
        let prev_state = Rc::clone(&prev_state);
        let field = field.clone();
        Rc::new(move |item: CompletionItemRef| {
            let text = field.prefix_text();
            reg.remove();
            prev_state.restore();
            debug!(text = %text, "completion committed");
            item.complete(&text).execute();
        })
    };

    reg.add(field.add_trait(Rc::new(CompletionSession {
        model: model.clone(),
        reg: Rc::clone(&reg),
        prev_state,
        completer: Rc::clone(&completer),
    })));
    let (view, listening) = menu::create_view(&model, completer);
    reg.add(listening);
    let view_handle = view.clone();
    reg.add(Registration::new(move || {
        if view_handle.parent().is_some() {
            view_handle.remove_from_parent();
        }
    }));
    reg.add(on_close);

    let _ = field.set(&BOTTOM_POPUP, Some(view));
}

struct CompletionSession {
    model: CompletionMenuModel,
    reg: Rc<CompositeRegistration>,
    prev_state: Rc<ContainerState>,
    completer: Rc<dyn Fn(CompletionItemRef)>,
}

impl CompletionSession {
    fn cancel(&self) {
        debug!("completion cancelled");
        self.reg.remove();
        self.prev_state.restore();
    }
}

impl CellTrait for CompletionSession {
    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if HIDE_COMPLETION.is(key) {
            let reg = Rc::clone(&self.reg);
            let prev_state = Rc::clone(&self.prev_state);
            let hide: Option<Rc<dyn Fn()>> = Some(Rc::new(move || {
                reg.remove();
                prev_state.restore();
            }));
            return Lookup::value(hide);
        }
        Lookup::Unset
    }

    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {
        if let Some(focus) = change.of(&FOCUSED)
            && !*focus.new
        {
            // Focus has already moved on, so the saved state is not restored.
            self.reg.remove();
            return;
        }
        if (TEXT.is(change.key) || CARET_POSITION.is(change.key))
            && let Some(field) = TextCell::from_cell(cell)
        {
            self.model.set_text(&field.prefix_text());
        }
    }

    fn on_key_pressed(&self, _cell: &Cell, event: &mut KeyEvent) {
        let Some(selected) = self.model.selected_item() else {
            return;
        };
        if !event.modifiers.is_empty() {
            return;
        }
        match event.code {
            KeyCode::Enter => {
                (self.completer)(selected);
                event.consume();
            }
            KeyCode::Up => {
                self.model.up();
                event.consume();
            }
            KeyCode::Down => {
                self.model.down();
                event.consume();
            }
            KeyCode::Escape => {
                self.cancel();
                event.consume();
            }
            _ => {}
        }
    }
}

/// Marks the side-transform session completed before running the item.
struct CompletedItem {
    inner: CompletionItemRef,
    completed: Rc<Flag<bool>>,
}

impl CompletionItem for CompletedItem {
    fn visible_text(&self, text: &str) -> String {
        self.inner.visible_text(text)
    }

    fn is_strict_match_prefix(&self, text: &str) -> bool {
        self.inner.is_strict_match_prefix(text)
    }

    fn is_match_prefix(&self, text: &str) -> bool {
        self.inner.is_match_prefix(text)
    }

    fn is_match(&self, text: &str) -> bool {
        self.inner.is_match(text)
    }

    fn is_low_priority(&self) -> bool {
        self.inner.is_low_priority()
    }

    fn complete(&self, text: &str) -> CellAction {
        self.completed.set(true);
        self.inner.complete(text)
    }
}

struct SideTransform {
    host: Cell,
    container: CellContainer,
    popup: WeakCell,
    field: WeakCell,
    helper: CompletionHelper,
    completed: Rc<Flag<bool>>,
    dismissed: Flag<bool>,
    editing: RefCell<Option<Registration>>,
    state: ContainerState,
}

impl SideTransform {
    fn dismiss(&self) {
        if self.dismissed.replace(true) {
            return;
        }
        debug!(completed = self.completed.get(), "side transform dismissed");
        if let Some(popup) = self.popup.upgrade()
            && popup.parent().is_some()
        {
            popup.remove_from_parent();
        }
        if let Some(editing) = self.editing.borrow_mut().take() {
            editing.remove();
        }
        if !self.completed.get() {
            self.state.restore();
        }
    }

    /// Eager commit after a typed character. Always claims the keystroke.
    fn after_type(&self) -> bool {
        let Some(field) = self.field.upgrade().and_then(|cell| TextCell::from_cell(&cell)) else {
            return false;
        };
        if !field.is_end() || field.is_empty() {
            return false;
        }
        let text = field.text();
        if self
            .helper
            .has_single_match(&text, self.host.get_trait(&EAGER_COMPLETION))
        {
            if let Some(item) = self.helper.matches(&text).first() {
                item.complete(&text).execute();
            }
            return true;
        }

        let split = text
            .char_indices()
            .next_back()
            .map_or(0, |(offset, _)| offset);
        let (prefix, suffix) = text.split_at(split);
        let matches = self.helper.matches(prefix);
        if matches.len() == 1 && self.helper.prefixed_by(&text).is_empty() {
            debug!(prefix, suffix, "side transform split");
            matches[0].complete(prefix).execute();
            for ch in suffix.chars() {
                self.container.key_typed(KeyEvent::typed(ch));
            }
        }
        true
    }
}

/// Text editing for the side-transform field plus its dismissal rules.
struct SideTransformEditing {
    session: Rc<SideTransform>,
    base: [Rc<dyn CellTrait>; 1],
}

impl CellTrait for SideTransformEditing {
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &self.base
    }

    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if AFTER_TYPE.is(key) {
            let session = Rc::clone(&self.session);
            let hook: Option<AfterType> = Some(Rc::new(move || session.after_type()));
            return Lookup::value(hook);
        }
        Lookup::Unset
    }

    fn on_property_changed(&self, _cell: &Cell, change: &PropertyChange<'_>) {
        if let Some(text) = change.of(&TEXT)
            && text.new.is_empty()
        {
            self.session.dismiss();
        }
    }

    fn on_key_pressed(&self, _cell: &Cell, event: &mut KeyEvent) {
        if event.is_plain(KeyCode::Escape) {
            self.session.dismiss();
            event.consume();
        }
    }
}

struct SideTransformItems {
    supplier: CompletionSupplier,
}

impl CellTrait for SideTransformItems {
    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if COMPLETION.is(key) {
            return Lookup::value(self.supplier.clone());
        }
        Lookup::Unset
    }
}

struct DismissOnFocusLoss {
    session: Rc<SideTransform>,
}

impl CellTrait for DismissOnFocusLoss {
    fn on_focus_lost(&self, cell: &Cell, event: &mut FocusEvent) {
        if event.old.as_ref() == Some(cell) {
            self.session.dismiss();
        }
    }
}

/// Open a side-transform field in `cell`'s `popup` slot. The slot must be
/// empty. Returns the focused field.
pub fn show_side_transform_popup(
    cell: &Cell,
    popup: &'static CellPropertySpec<Option<Cell>>,
    items: Vec<CompletionItemRef>,
) -> TextCell {
    let container = require_container(cell);
    let state = container.save_state();
    let completed = Rc::new(Flag::new(false));

    let wrapped: Vec<CompletionItemRef> = items
        .into_iter()
        .map(|inner| {
            Rc::new(CompletedItem {
                inner,
                completed: Rc::clone(&completed),
            }) as CompletionItemRef
        })
        .collect();

    let holder = Cell::horizontal();
    let field = TextCell::new();
    let _ = field.add_trait(Rc::new(SideTransformItems {
        supplier: CompletionSupplier::from_items(wrapped.clone()),
    }));

    let session = Rc::new(SideTransform {
        host: cell.clone(),
        container,
        popup: holder.downgrade(),
        field: field.downgrade(),
        helper: CompletionHelper::new(wrapped),
        completed,
        dismissed: Flag::new(false),
        editing: RefCell::new(None),
        state,
    });
    let editing = field.add_trait(Rc::new(SideTransformEditing {
        session: Rc::clone(&session),
        base: [text_editing()],
    }));
    *session.editing.borrow_mut() = Some(editing);

    holder.add_child(field.cell().clone());
    if cell.get(popup).is_some() {
        fatal(CellError::PopupOccupied);
    }
    let _ = cell.set(popup, Some(holder));
    field.focus();

    let _ = field.add_trait(Rc::new(DismissOnFocusLoss { session }));
    debug!(popup = popup.name(), "side transform opened");
    field
}
