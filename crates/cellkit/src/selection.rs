#![forbid(unsafe_code)]

//! Range selection over the children of a target cell.
//!
//! A [`SelectionSupport`] correlates the i-th child of its target cell with
//! the i-th item of an observable source list and keeps a contiguous run of
//! selected items. Shift+Down/Right grow or shrink the run forwards,
//! Shift+Up/Left backwards; the caret boundary of the current child decides
//! whether the current item toggles or the gesture moves to the neighbour.
//!
//! # Nesting
//!
//! Regions nest. A region with an empty selection yields to the nearest
//! enclosing region when that one has a selection and the path up to it
//! runs only through first or last children.
//!
//! # Reentrancy
//!
//! Gestures move focus while the selection changes. Focus handlers ignore
//! those moves; a gesture or `select` started from inside a change panics
//! with [`CellError::SelectionReentered`].

use std::cell::Cell as Flag;
use std::fmt;
use std::rc::Rc;

use cellkit_core::{Consumable, KeyCode, KeyEvent, Modifiers, Observable};
use tracing::debug;

use crate::action::{self, CellAction};
use crate::cell::{Cell, WeakCell};
use crate::cell_trait::CellTrait;
use crate::composites;
use crate::error::{CellError, fatal};
use crate::event::FocusEvent;
use crate::position;
use crate::property::{CellTraitPropertySpec, Lookup, PropertyKey};

/// A selection region as seen from nested regions.
pub trait SelectionRegion {
    fn has_selection(&self) -> bool;
}

/// Answered by the target cell of every [`SelectionSupport`].
pub static SELECTION_SUPPORT: CellTraitPropertySpec<Option<Rc<dyn SelectionRegion>>> =
    CellTraitPropertySpec::new("selectionSupport", |_| None);

/// Shift+Arrow range selection over the children of one cell.
pub struct SelectionSupport<T> {
    region: Rc<Region<T>>,
}

impl<T> Clone for SelectionSupport<T> {
    fn clone(&self) -> Self {
        Self {
            region: Rc::clone(&self.region),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SelectionSupport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSupport")
            .field("selection", &self.region.selection)
            .field("changing", &self.region.changing.get())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> SelectionSupport<T> {
    /// Install selection handling on `target`. Child `i` of `target` shows
    /// item `i` of `source`.
    pub fn new(source: Observable<Vec<T>>, target: &Cell) -> Self {
        let region = Rc::new(Region {
            source,
            target: target.downgrade(),
            selection: Observable::new(Vec::new()),
            changing: Flag::new(false),
        });
        let _ = target.add_trait(Rc::new(SelectionTrait {
            region: Rc::clone(&region),
        }));
        Self { region }
    }

    /// The selected items, in source order.
    #[must_use]
    pub fn selection(&self) -> Observable<Vec<T>> {
        self.region.selection.clone()
    }

    /// The child of the target that holds focus, if any.
    #[must_use]
    pub fn current_cell(&self) -> Option<Cell> {
        self.region.current_cell()
    }

    /// Select the closed range `from..=to` of the source.
    ///
    /// Panics when either item is missing or they are out of order, when
    /// focus is outside the target, or when the focused child lies outside
    /// the range.
    pub fn select(&self, from: &T, to: &T) {
        self.region.select(from, to);
    }

    pub fn clear_selection(&self) {
        self.region.change_selection(|| self.region.selection.set(Vec::new()));
    }
}

struct Region<T> {
    source: Observable<Vec<T>>,
    target: WeakCell,
    selection: Observable<Vec<T>>,
    changing: Flag<bool>,
}

/// Resets the changing flag when a selection change ends, unwinding included.
struct ChangingGuard<'a>(&'a Flag<bool>);

impl Drop for ChangingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: Clone + PartialEq + 'static> Region<T> {
    fn target(&self) -> Cell {
        match self.target.upgrade() {
            Some(target) => target,
            None => fatal(CellError::Detached),
        }
    }

    fn current_cell(&self) -> Option<Cell> {
        if self.source.with(Vec::is_empty) {
            return None;
        }
        let target = self.target.upgrade()?;
        let focused = target.container()?.focused_cell()?;
        std::iter::once(focused.clone())
            .chain(composites::ancestors(&focused))
            .find(|cell| cell.parent().as_ref() == Some(&target))
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.source.with(|items| items.iter().position(|i| i == item))
    }

    fn item(&self, index: usize) -> Option<T> {
        self.source.with(|items| items.get(index).cloned())
    }

    fn contains(&self, item: &T) -> bool {
        self.selection.with(|selected| selected.contains(item))
    }

    fn push(&self, item: T) {
        self.selection.update(|selected| selected.push(item));
    }

    fn push_front(&self, item: T) {
        self.selection.update(|selected| selected.insert(0, item));
    }

    fn remove(&self, item: &T) {
        self.selection.update(|selected| {
            if let Some(index) = selected.iter().position(|i| i == item) {
                selected.remove(index);
            }
        });
    }

    fn select(&self, from: &T, to: &T) {
        let (start, end) = match (self.index_of(from), self.index_of(to)) {
            (Some(start), Some(end)) if start <= end => (start, end),
            (start, end) => fatal(CellError::SelectionRange { from: start, to: end }),
        };
        let target = self.target();
        let focused = target.container().and_then(|c| c.focused_cell());
        if !focused.is_some_and(|cell| composites::is_descendant(&target, &cell)) {
            fatal(CellError::FocusOutsideSelection);
        }
        let current = self
            .current_cell()
            .and_then(|cell| target.index_of(&cell));
        if !current.is_some_and(|index| (start..=end).contains(&index)) {
            fatal(CellError::FocusOutsideSelection);
        }

        self.run_selection_action(|| {
            let range = self.source.with(|items| items[start..=end].to_vec());
            self.selection.set(range);
        });
    }

    fn run_selection_action(&self, change: impl FnOnce()) {
        if self.changing.get() {
            fatal(CellError::SelectionReentered);
        }
        self.change_selection(change);
    }

    fn change_selection(&self, change: impl FnOnce()) {
        self.changing.set(true);
        let _guard = ChangingGuard(&self.changing);
        change();
        debug!(
            selected = self.selection.with(Vec::len),
            "selection changed"
        );
    }

    /// An enclosing region with a selection takes the gesture while this
    /// one has none.
    fn yields(&self) -> bool {
        if self.selection.with(|selected| !selected.is_empty()) {
            return false;
        }
        let mut current = self.target();
        loop {
            let Some(parent) = current.parent() else {
                return false;
            };
            if let Some(region) = parent.get_trait(&SELECTION_SUPPORT) {
                return region.has_selection();
            }
            if !composites::is_last_child(&current) && !composites::is_first_child(&current) {
                return false;
            }
            current = parent;
        }
    }

    /// Collapse a single-child wrapper onto the list child that holds it.
    fn normalize_focus(&self, cell: &Cell, target: &Cell) -> Cell {
        let Some(parent) = cell.parent() else {
            return cell.clone();
        };
        if parent.child_count() != 1 || parent.index_of(cell).is_none() || &parent == target {
            return cell.clone();
        }
        match parent.parent() {
            Some(grandparent) if &grandparent == target => parent,
            _ => cell.clone(),
        }
    }

    fn focus_and_scroll_to(&self, index: usize, first: bool) -> CellAction {
        let Some(child) = self.target().child(index) else {
            return CellAction::empty();
        };
        let focus = if first {
            action::to_first_focusable(&child)
        } else {
            action::to_last_focusable(&child)
        };
        action::seq([focus, action::scroll_to(&child)])
    }

    /// Current child with its index and item.
    fn current(&self) -> Option<(Cell, usize, T)> {
        let current = self.current_cell()?;
        let index = self.target().index_of(&current)?;
        let item = self.item(index)?;
        Some((current, index, item))
    }

    fn extend_forward(&self, event: &mut KeyEvent) {
        if self.yields() {
            return;
        }
        let Some((current, index, item)) = self.current() else {
            return;
        };
        let last = self.target().child_count().saturating_sub(1);

        if !position::is_end_position(&current) {
            if self.contains(&item) {
                self.remove(&item);
                if index == last {
                    self.focus_and_scroll_to(index, false).execute();
                } else {
                    self.focus_and_scroll_to(index + 1, true).execute();
                }
            } else {
                self.push(item);
                self.focus_and_scroll_to(index, false).execute();
            }
            event.consume();
            return;
        }

        if !self.contains(&item)
            && position::is_home_position(&current)
            && position::is_end_position(&current)
        {
            self.push(item.clone());
        }
        if index == last {
            return;
        }
        let Some(next) = self.item(index + 1) else {
            return;
        };
        if self.contains(&next) {
            self.remove(&item);
            self.focus_and_scroll_to(index + 1, true).execute();
        } else {
            self.push(next);
            self.focus_and_scroll_to(index + 1, false).execute();
        }
        event.consume();
    }

    fn extend_backward(&self, event: &mut KeyEvent) {
        if self.yields() {
            return;
        }
        let Some((current, index, item)) = self.current() else {
            return;
        };

        if !position::is_home_position(&current) {
            if self.contains(&item) {
                self.remove(&item);
                if index == 0 {
                    self.focus_and_scroll_to(index, true).execute();
                } else {
                    self.focus_and_scroll_to(index - 1, false).execute();
                }
            } else {
                self.push_front(item);
                self.focus_and_scroll_to(index, true).execute();
            }
            event.consume();
            return;
        }

        if !self.contains(&item)
            && position::is_home_position(&current)
            && position::is_end_position(&current)
        {
            self.push(item.clone());
        }
        if index == 0 {
            return;
        }
        let Some(prev) = self.item(index - 1) else {
            return;
        };
        if self.contains(&prev) {
            self.remove(&item);
            self.focus_and_scroll_to(index - 1, false).execute();
        } else {
            self.push_front(prev);
            self.focus_and_scroll_to(index - 1, true).execute();
        }
        event.consume();
    }
}

impl<T: Clone + PartialEq + 'static> SelectionRegion for Region<T> {
    fn has_selection(&self) -> bool {
        self.selection.with(|selected| !selected.is_empty())
    }
}

struct SelectionTrait<T> {
    region: Rc<Region<T>>,
}

impl<T: Clone + PartialEq + 'static> CellTrait for SelectionTrait<T> {
    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if SELECTION_SUPPORT.is(key) {
            let region: Rc<dyn SelectionRegion> = Rc::clone(&self.region) as _;
            return Lookup::value(Some(region));
        }
        Lookup::Unset
    }

    fn on_focus_gained(&self, cell: &Cell, event: &mut FocusEvent) {
        let Some(new) = &event.new else {
            return;
        };
        let normalized = self.region.normalize_focus(new, cell);
        if cell.index_of(&normalized).is_none() || self.region.changing.get() {
            return;
        }
        self.region
            .change_selection(|| self.region.selection.set(Vec::new()));
    }

    fn on_focus_lost(&self, cell: &Cell, event: &mut FocusEvent) {
        if self.region.changing.get() {
            return;
        }
        if let Some(new) = &event.new
            && composites::is_descendant(cell, new)
        {
            return;
        }
        self.region
            .change_selection(|| self.region.selection.set(Vec::new()));
    }

    fn on_key_pressed(&self, _cell: &Cell, event: &mut KeyEvent) {
        if event.modifiers != Modifiers::SHIFT {
            return;
        }
        let region = &self.region;
        match event.code {
            KeyCode::Down | KeyCode::Right => {
                region.run_selection_action(|| region.extend_forward(event));
            }
            KeyCode::Up | KeyCode::Left => {
                region.run_selection_action(|| region.extend_backward(event));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::CellContainer;
    use crate::text::TextCell;
    use crate::text::editing::text_editing;

    struct Fixture {
        container: CellContainer,
        items: Vec<TextCell>,
        support: SelectionSupport<u32>,
    }

    fn fixture(texts: &[&str]) -> Fixture {
        let container = CellContainer::new();
        let list = Cell::vertical();
        let items: Vec<TextCell> = texts
            .iter()
            .map(|text| {
                let cell = TextCell::with_text(*text);
                let _ = cell.add_trait(text_editing());
                list.add_child(cell.cell().clone());
                cell
            })
            .collect();
        container.root().add_child(list.clone());
        let source = Observable::new((0..texts.len() as u32).collect());
        let support = SelectionSupport::new(source, &list);
        Fixture {
            container,
            items,
            support,
        }
    }

    fn shift(container: &CellContainer, code: KeyCode) -> bool {
        container.key_pressed(KeyEvent::new(code).with_modifiers(Modifiers::SHIFT))
    }

    #[test]
    fn select_replaces_range() {
        let f = fixture(&["a", "b", "c"]);
        f.items[1].focus();
        f.support.select(&0, &2);
        assert_eq!(f.support.selection().get(), vec![0, 1, 2]);
        f.support.clear_selection();
        assert!(f.support.selection().get().is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid selection range")]
    fn select_rejects_reversed_range() {
        let f = fixture(&["a", "b", "c"]);
        f.items[1].focus();
        f.support.select(&2, &0);
    }

    #[test]
    #[should_panic(expected = "focus is outside the selection range")]
    fn select_requires_focus_in_range() {
        let f = fixture(&["a", "b", "c"]);
        f.items[0].focus();
        f.support.select(&1, &2);
    }

    #[test]
    fn current_cell_tracks_focus() {
        let f = fixture(&["a", "b"]);
        assert_eq!(f.support.current_cell(), None);
        f.items[1].focus();
        assert_eq!(f.support.current_cell().as_ref(), Some(f.items[1].cell()));
    }

    #[test]
    fn caret_inside_text_toggles_current_item() {
        let f = fixture(&["ab", "cd"]);
        f.items[0].focus();
        assert!(shift(&f.container, KeyCode::Right));
        assert_eq!(f.support.selection().get(), vec![0]);
        assert!(f.items[0].is_end());

        // At the end now: the next item joins and takes focus at its end.
        assert!(shift(&f.container, KeyCode::Right));
        assert_eq!(f.support.selection().get(), vec![0, 1]);
        assert!(f.items[1].is_focused());

        // Back across the boundary.
        assert!(shift(&f.container, KeyCode::Left));
        assert_eq!(f.support.selection().get(), vec![0]);
        assert!(f.items[0].is_focused());
    }

    #[test]
    fn user_focus_change_clears_selection() {
        let f = fixture(&["", "", ""]);
        f.items[0].focus();
        assert!(shift(&f.container, KeyCode::Down));
        assert!(!f.support.selection().get().is_empty());
        f.items[2].focus();
        assert!(f.support.selection().get().is_empty());
    }

    #[test]
    fn focus_leaving_region_clears_selection() {
        let f = fixture(&["", ""]);
        let outside = TextCell::new();
        let _ = outside.add_trait(text_editing());
        f.container.root().add_child(outside.cell().clone());
        f.items[0].focus();
        assert!(shift(&f.container, KeyCode::Down));
        outside.focus();
        assert!(f.support.selection().get().is_empty());
    }

    #[test]
    #[should_panic(expected = "selection changed while changing selection")]
    fn reentrant_select_is_fatal() {
        let f = fixture(&["", ""]);
        f.items[0].focus();
        let support = f.support.clone();
        let _sub = f.support.selection().subscribe(move |_| support.select(&0, &0));
        shift(&f.container, KeyCode::Down);
    }
}
