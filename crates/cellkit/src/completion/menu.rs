#![forbid(unsafe_code)]

//! Completion menu model and its cell view.
//!
//! The model filters its items by the typed text, sorts them (exact matches
//! first, then regular before low-priority items, then by label) and keeps
//! one selected item. The view is a vertical cell with one text cell per
//! visible item, rebuilt whenever the model changes.

use std::cell::{Cell as Flag, RefCell};
use std::rc::{Rc, Weak};

use cellkit_core::{Consumable, Listeners, MouseEvent, Observable, Registration, Subscription};
use tracing::trace;

use crate::cell::{Cell, SELECTED};
use crate::cell_trait::CellTrait;
use crate::completion::{CompletionItemRef, same_item};
use crate::config::DEFAULT_MENU_MAX_ITEMS;
use crate::error::{CellError, fatal};
use crate::text::TextCell;

struct MenuInner {
    text: Observable<String>,
    items: RefCell<Vec<CompletionItemRef>>,
    visible: RefCell<Vec<CompletionItemRef>>,
    selected: RefCell<Option<CompletionItemRef>>,
    max_items: usize,
    changing: Flag<bool>,
    listeners: Listeners<dyn Fn()>,
    text_subscription: RefCell<Option<Subscription>>,
}

/// Shared handle to a completion menu's state.
#[derive(Clone)]
pub struct CompletionMenuModel {
    inner: Rc<MenuInner>,
}

impl CompletionMenuModel {
    #[must_use]
    pub fn new(items: Vec<CompletionItemRef>) -> Self {
        Self::with_max_items(items, DEFAULT_MENU_MAX_ITEMS)
    }

    /// A model showing at most `max_items` visible entries.
    #[must_use]
    pub fn with_max_items(items: Vec<CompletionItemRef>, max_items: usize) -> Self {
        let model = Self {
            inner: Rc::new(MenuInner {
                text: Observable::new(String::new()),
                items: RefCell::new(items),
                visible: RefCell::new(Vec::new()),
                selected: RefCell::new(None),
                max_items: max_items.max(1),
                changing: Flag::new(false),
                listeners: Listeners::new(),
                text_subscription: RefCell::new(None),
            }),
        };
        let weak = Rc::downgrade(&model.inner);
        let subscription = model.inner.text.subscribe(move |_| {
            if let Some(model) = Self::upgrade(&weak) {
                model.refresh();
            }
        });
        *model.inner.text_subscription.borrow_mut() = Some(subscription);
        model.refresh();
        model
    }

    fn upgrade(weak: &Weak<MenuInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// The typed text slot the visible items follow.
    #[must_use]
    pub fn text(&self) -> Observable<String> {
        self.inner.text.clone()
    }

    pub fn set_text(&self, text: &str) {
        self.inner.text.set(text.to_string());
    }

    #[must_use]
    pub fn items(&self) -> Vec<CompletionItemRef> {
        self.inner.items.borrow().clone()
    }

    pub fn set_items(&self, items: Vec<CompletionItemRef>) {
        *self.inner.items.borrow_mut() = items;
        self.refresh();
    }

    #[must_use]
    pub fn visible_items(&self) -> Vec<CompletionItemRef> {
        self.inner.visible.borrow().clone()
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<CompletionItemRef> {
        self.inner.selected.borrow().clone()
    }

    /// Select a visible item, or clear the selection.
    pub fn select(&self, item: Option<CompletionItemRef>) {
        self.change_selection(item);
    }

    /// Move the selection one entry up. Fatal without a selection.
    pub fn up(&self) {
        let index = self.selected_index();
        if index > 0 {
            let item = self.inner.visible.borrow()[index - 1].clone();
            self.change_selection(Some(item));
        }
    }

    /// Move the selection one entry down. Fatal without a selection.
    pub fn down(&self) {
        let index = self.selected_index();
        let next = self.inner.visible.borrow().get(index + 1).cloned();
        if let Some(item) = next {
            self.change_selection(Some(item));
        }
    }

    /// Called after every visible-list or selection change.
    pub fn add_listener(&self, listener: Rc<dyn Fn()>) -> Registration {
        self.inner.listeners.add(listener)
    }

    fn selected_index(&self) -> usize {
        let Some(selected) = self.selected_item() else {
            fatal(CellError::NoSelectedItem);
        };
        self.inner
            .visible
            .borrow()
            .iter()
            .position(|item| same_item(item, &selected))
            .unwrap_or(0)
    }

    fn refresh(&self) {
        let text = self.inner.text.get();
        let mut visible: Vec<CompletionItemRef> = self
            .inner
            .items
            .borrow()
            .iter()
            .filter(|item| item.is_match_prefix(&text))
            .cloned()
            .collect();
        visible.sort_by(|a, b| {
            b.is_match(&text)
                .cmp(&a.is_match(&text))
                .then(a.is_low_priority().cmp(&b.is_low_priority()))
                .then_with(|| a.visible_text(&text).cmp(&b.visible_text(&text)))
        });
        visible.truncate(self.inner.max_items);

        let selected = self
            .selected_item()
            .filter(|sel| visible.iter().any(|item| same_item(item, sel)))
            .or_else(|| visible.first().cloned());
        trace!(text = %text, visible = visible.len(), "completion menu refreshed");
        *self.inner.visible.borrow_mut() = visible;
        self.change_selection(selected);
    }

    fn change_selection(&self, item: Option<CompletionItemRef>) {
        if self.inner.changing.get() {
            fatal(CellError::SelectionReentered);
        }
        self.inner.changing.set(true);
        *self.inner.selected.borrow_mut() = item;
        self.inner.listeners.fire(|listener| listener());
        self.inner.changing.set(false);
    }
}

impl std::fmt::Debug for CompletionMenuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionMenuModel")
            .field("text", &self.inner.text.get())
            .field("items", &self.inner.items.borrow().len())
            .field("visible", &self.inner.visible.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Commits an item when it is clicked.
struct MenuEntry {
    item: CompletionItemRef,
    completer: Rc<dyn Fn(CompletionItemRef)>,
}

impl CellTrait for MenuEntry {
    fn on_mouse_pressed(&self, _cell: &Cell, event: &mut MouseEvent) {
        (self.completer)(Rc::clone(&self.item));
        event.consume();
    }
}

/// Build the menu view for `model`; clicking an entry hands its item to
/// `completer`. The view follows the model until the returned
/// registration is removed.
pub fn create_view(
    model: &CompletionMenuModel,
    completer: Rc<dyn Fn(CompletionItemRef)>,
) -> (Cell, Registration) {
    let view = Cell::vertical();
    rebuild(&view, model, &completer);

    let weak_view = view.downgrade();
    let weak_model = Rc::downgrade(&model.inner);
    let listening = model.add_listener(Rc::new(move || {
        if let Some(view) = weak_view.upgrade()
            && let Some(model) = CompletionMenuModel::upgrade(&weak_model)
        {
            rebuild(&view, &model, &completer);
        }
    }));
    (view, listening)
}

fn rebuild(view: &Cell, model: &CompletionMenuModel, completer: &Rc<dyn Fn(CompletionItemRef)>) {
    view.clear_children();
    let text = model.inner.text.get();
    let selected = model.selected_item();
    for item in model.visible_items() {
        let entry = TextCell::with_text(item.visible_text(&text));
        if selected.as_ref().is_some_and(|sel| same_item(sel, &item)) {
            let _ = entry.set(&SELECTED, true);
        }
        let _ = entry.add_trait(Rc::new(MenuEntry {
            item,
            completer: Rc::clone(completer),
        }));
        view.add_child(entry.into());
    }
}
