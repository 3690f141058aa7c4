//! Shift+Arrow selection gestures, including nested regions.

use std::cell::RefCell;
use std::rc::Rc;

use cellkit::text::editing::text_editing;
use cellkit::{Cell, CellContainer, SelectionSupport, TextCell};
use cellkit_core::{KeyCode, KeyEvent, Modifiers, Observable};

fn shift(container: &CellContainer, code: KeyCode) -> bool {
    container.key_pressed(KeyEvent::new(code).with_modifiers(Modifiers::SHIFT))
}

fn text_cells(list: &Cell, texts: &[&str]) -> Vec<TextCell> {
    texts
        .iter()
        .map(|text| {
            let cell = TextCell::with_text(*text);
            let _ = cell.add_trait(text_editing());
            list.add_child(cell.cell().clone());
            cell
        })
        .collect()
}

fn region(list: &Cell, items: &[u32]) -> SelectionSupport<u32> {
    SelectionSupport::new(Observable::new(items.to_vec()), list)
}

// ═══════════════════════════════════════════════════════════════════════
// Flat lists
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn shift_down_over_empty_items_grows_one_at_a_time() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", "", "", "", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1, 2, 3, 4]);

    let trace = support.selection();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let _sub = {
        let seen = Rc::clone(&seen);
        trace.subscribe(move |selection: &Vec<u32>| seen.borrow_mut().push(selection.clone()))
    };

    items[0].focus();
    for _ in 0..4 {
        assert!(shift(&container, KeyCode::Down));
    }
    assert_eq!(
        *seen.borrow(),
        vec![
            vec![0],
            vec![0, 1],
            vec![0, 1, 2],
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3, 4],
        ]
    );
    assert!(items[4].is_focused());

    // Nothing left to extend into.
    assert!(!shift(&container, KeyCode::Down));
    assert_eq!(support.selection().get(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn selections_after_each_press() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", "", "", "", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1, 2, 3, 4]);

    items[0].focus();
    let mut after = Vec::new();
    for _ in 0..4 {
        shift(&container, KeyCode::Down);
        after.push(support.selection().get());
    }
    assert_eq!(
        after,
        vec![vec![0, 1], vec![0, 1, 2], vec![0, 1, 2, 3], vec![0, 1, 2, 3, 4]]
    );
}

#[test]
fn shift_up_shrinks_from_the_end() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", "", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1, 2]);

    items[0].focus();
    assert!(shift(&container, KeyCode::Down));
    assert!(shift(&container, KeyCode::Down));
    assert_eq!(support.selection().get(), vec![0, 1, 2]);

    assert!(shift(&container, KeyCode::Up));
    assert_eq!(support.selection().get(), vec![0, 1]);
    assert!(items[1].is_focused());
}

#[test]
fn shift_up_grows_backwards() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", "", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[7, 8, 9]);

    items[2].focus();
    assert!(shift(&container, KeyCode::Up));
    assert_eq!(support.selection().get(), vec![8, 9]);
    assert!(items[1].is_focused());
    assert!(shift(&container, KeyCode::Left));
    assert_eq!(support.selection().get(), vec![7, 8, 9]);
    assert!(items[0].is_focused());
}

#[test]
fn unmodified_arrows_do_not_select() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1]);

    items[0].focus();
    assert!(!container.key_pressed(KeyEvent::new(KeyCode::Down)));
    let ctrl_shift = Modifiers::SHIFT | Modifiers::CTRL;
    assert!(!container.key_pressed(KeyEvent::new(KeyCode::Down).with_modifiers(ctrl_shift)));
    assert!(support.selection().get().is_empty());
}

#[test]
fn select_then_extend_continues_from_range() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let items = text_cells(&list, &["", "", "", ""]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1, 2, 3]);

    items[1].focus();
    support.select(&0, &1);
    assert_eq!(support.selection().get(), vec![0, 1]);
    assert!(shift(&container, KeyCode::Down));
    assert_eq!(support.selection().get(), vec![0, 1, 2]);
    assert!(items[2].is_focused());
}

// ═══════════════════════════════════════════════════════════════════════
// Nested regions
// ═══════════════════════════════════════════════════════════════════════

struct Nested {
    container: CellContainer,
    outer: SelectionSupport<u32>,
    inner: SelectionSupport<u32>,
    first: Vec<TextCell>,
    second: Vec<TextCell>,
}

/// An outer list of two inner lists; the first inner list is itself a
/// selection region with `first_len` empty text cells.
fn nested(first_len: usize) -> Nested {
    let container = CellContainer::new();
    let outer_list = Cell::vertical();
    let first_list = Cell::vertical();
    let second_list = Cell::vertical();
    let first = text_cells(&first_list, &vec![""; first_len]);
    let second = text_cells(&second_list, &[""]);
    outer_list.add_child(first_list.clone());
    outer_list.add_child(second_list);
    container.root().add_child(outer_list.clone());

    let outer = region(&outer_list, &[10, 20]);
    let inner_items: Vec<u32> = (1..=first_len as u32).collect();
    let inner = region(&first_list, &inner_items);
    Nested {
        container,
        outer,
        inner,
        first,
        second,
    }
}

#[test]
fn inner_region_with_selection_keeps_the_gesture() {
    let n = nested(2);
    n.first[0].focus();
    assert!(shift(&n.container, KeyCode::Down));
    assert_eq!(n.inner.selection().get(), vec![1, 2]);
    assert!(n.outer.selection().get().is_empty());

    assert!(shift(&n.container, KeyCode::Up));
    assert_eq!(n.inner.selection().get(), vec![1]);
    assert!(n.first[0].is_focused());
    assert!(n.outer.selection().get().is_empty());
}

#[test]
fn empty_inner_region_yields_to_selecting_outer_region() {
    let n = nested(1);
    n.first[0].focus();
    n.outer.select(&10, &10);

    assert!(shift(&n.container, KeyCode::Down));
    assert_eq!(n.outer.selection().get(), vec![10, 20]);
    assert!(n.inner.selection().get().is_empty());
    assert!(n.second[0].is_focused());
}

#[test]
fn focus_moving_out_of_inner_region_clears_it() {
    let n = nested(2);
    n.first[0].focus();
    assert!(shift(&n.container, KeyCode::Down));
    assert!(!n.inner.selection().get().is_empty());

    n.second[0].focus();
    assert!(n.inner.selection().get().is_empty());
}

#[test]
fn focus_moving_inside_an_item_keeps_selection() {
    let container = CellContainer::new();
    let list = Cell::vertical();
    let row = Cell::horizontal();
    let parts = text_cells(&row, &["a", "b"]);
    list.add_child(row);
    let rest = text_cells(&list, &["c"]);
    let outside = text_cells(&container.root(), &["d"]);
    container.root().add_child(list.clone());
    let support = region(&list, &[0, 1]);

    parts[0].focus();
    support.select(&0, &1);
    parts[1].focus();
    assert_eq!(support.selection().get(), vec![0, 1]);

    // A plain focus move onto another item starts over.
    rest[0].focus();
    assert!(support.selection().get().is_empty());

    support.select(&0, &1);
    outside[0].focus();
    assert!(support.selection().get().is_empty());
}
