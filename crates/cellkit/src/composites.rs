#![forbid(unsafe_code)]

//! Tree queries over cells: ancestry, sibling position, focusable search.
//!
//! Only visible cells take part in the focusable searches; an invisible
//! cell hides its whole subtree.

use crate::cell::{Cell, FOCUSABLE, VISIBLE};

/// Ancestors of `cell`, nearest first, excluding the cell itself.
pub fn ancestors(cell: &Cell) -> impl Iterator<Item = Cell> {
    std::iter::successors(cell.parent(), Cell::parent)
}

/// Whether `cell` is `ancestor` or lies below it (through popups too).
#[must_use]
pub fn is_descendant(ancestor: &Cell, cell: &Cell) -> bool {
    ancestor.is_ancestor_of(cell)
}

/// Whether `cell` is the first entry of its parent's children list.
#[must_use]
pub fn is_first_child(cell: &Cell) -> bool {
    cell.parent()
        .and_then(|parent| parent.index_of(cell))
        .is_some_and(|index| index == 0)
}

/// Whether `cell` is the last entry of its parent's children list.
#[must_use]
pub fn is_last_child(cell: &Cell) -> bool {
    cell.parent().is_some_and(|parent| {
        parent
            .index_of(cell)
            .is_some_and(|index| index + 1 == parent.child_count())
    })
}

fn is_focusable(cell: &Cell) -> bool {
    cell.get(&FOCUSABLE)
}

/// The deepest first focusable cell of the subtree rooted at `cell`,
/// `cell` included.
#[must_use]
pub fn first_focusable(cell: &Cell) -> Option<Cell> {
    if !cell.get(&VISIBLE) {
        return None;
    }
    cell.children()
        .iter()
        .find_map(first_focusable)
        .or_else(|| is_focusable(cell).then(|| cell.clone()))
}

/// The deepest last focusable cell of the subtree rooted at `cell`.
#[must_use]
pub fn last_focusable(cell: &Cell) -> Option<Cell> {
    if !cell.get(&VISIBLE) {
        return None;
    }
    cell.children()
        .iter()
        .rev()
        .find_map(last_focusable)
        .or_else(|| is_focusable(cell).then(|| cell.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focusable() -> Cell {
        let cell = Cell::default();
        let _ = cell.set(&FOCUSABLE, true);
        cell
    }

    #[test]
    fn sibling_position() {
        let parent = Cell::horizontal();
        let a = Cell::default();
        let b = Cell::default();
        parent.add_child(a.clone());
        parent.add_child(b.clone());

        assert!(is_first_child(&a));
        assert!(!is_last_child(&a));
        assert!(is_last_child(&b));
        assert!(!is_first_child(&parent));
        assert!(!is_last_child(&parent));
    }

    #[test]
    fn ancestors_nearest_first() {
        let root = Cell::default();
        let mid = Cell::default();
        let leaf = Cell::default();
        root.add_child(mid.clone());
        mid.add_child(leaf.clone());

        let chain: Vec<Cell> = ancestors(&leaf).collect();
        assert_eq!(chain, vec![mid.clone(), root.clone()]);
        assert!(is_descendant(&root, &leaf));
        assert!(!is_descendant(&leaf, &root));
    }

    #[test]
    fn focusable_search_prefers_deepest() {
        let root = focusable();
        let left = Cell::default();
        let a = focusable();
        let b = focusable();
        let hidden = focusable();
        root.add_child(left.clone());
        left.add_child(a.clone());
        left.add_child(b.clone());
        root.add_child(hidden.clone());
        let _ = hidden.set(&VISIBLE, false);

        assert_eq!(first_focusable(&root), Some(a));
        assert_eq!(last_focusable(&root), Some(b));
    }

    #[test]
    fn focusable_search_falls_back_to_self() {
        let cell = focusable();
        cell.add_child(Cell::default());
        assert_eq!(first_focusable(&cell), Some(cell.clone()));
        assert_eq!(last_focusable(&cell), Some(cell.clone()));
        assert_eq!(first_focusable(&Cell::default()), None);
    }
}
